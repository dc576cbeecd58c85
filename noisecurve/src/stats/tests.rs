use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::frame::Frame;
use crate::source::{FileSetSpec, FrameSource};
use crate::stack::{CacheConfig, StackBuilder, StackConfig, StorageMode};
use crate::test_utils::{constant_frame, frame_from_values, write_fits_u16};

const EPSILON: f64 = 1e-9;

fn stack_of(frames: Vec<Frame>) -> FrameStack {
    FrameStack::from_frames(frames).unwrap()
}

fn random_frames(shape: FrameShape, count: usize, seed: u64) -> Vec<Vec<u16>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            (0..shape.pixel_count())
                .map(|_| rng.random_range(0..4096u16))
                .collect()
        })
        .collect()
}

fn as_frames(shape: FrameShape, data: &[Vec<u16>]) -> Vec<Frame> {
    data.iter()
        .map(|values| frame_from_values(shape, values.iter().map(|&v| f32::from(v)).collect()))
        .collect()
}

#[test]
fn test_median_odd() {
    assert_eq!(median_mut(&mut [3.0, 1.0, 2.0]), 2.0);
    assert_eq!(median_mut(&mut [5.0]), 5.0);
}

#[test]
fn test_median_even_averages_middle_pair() {
    assert_eq!(median_mut(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    assert_eq!(median_mut(&mut [10.0, 20.0]), 15.0);
}

#[test]
fn test_median_empty_and_nan() {
    assert!(median_mut(&mut []).is_nan());
    assert!(median_mut(&mut [1.0, f64::NAN, 3.0]).is_nan());
}

#[test]
fn test_population_std_dev() {
    let std_dev = population_std_dev(&[10.0, 20.0, 30.0]);
    assert!((std_dev - (200.0f64 / 3.0).sqrt()).abs() < EPSILON);
    assert!((std_dev - 8.16496580927726).abs() < EPSILON);

    assert_eq!(population_std_dev(&[42.0]), 0.0);
    assert!(population_std_dev(&[]).is_nan());
}

#[test]
fn test_std_dev_of_identical_values_is_exactly_zero() {
    assert_eq!(population_std_dev(&[0.1, 0.1, 0.1]), 0.0);
    assert_eq!(population_std_dev(&[65535.0; 7]), 0.0);
}

#[test]
fn test_median_and_std_dev_nan_propagates() {
    let (median, std_dev) = median_and_std_dev(&mut [1.0, f64::NAN]);
    assert!(median.is_nan());
    assert!(std_dev.is_nan());
}

#[test]
fn test_three_frame_scenario() {
    let shape = FrameShape::new(2, 2);
    let stack = stack_of(vec![
        constant_frame(shape, 10.0),
        constant_frame(shape, 20.0),
        constant_frame(shape, 30.0),
    ]);

    let grid = compute(&stack, &CancelFlag::new()).unwrap();
    assert_eq!(grid.shape(), shape);
    for (&median, &std_dev) in grid.median().pixels().iter().zip(grid.std_dev().pixels()) {
        assert_eq!(median, 20.0);
        assert!((std_dev - 8.16496580927726).abs() < EPSILON);
    }
}

#[test]
fn test_single_frame_has_zero_std_dev() {
    let shape = FrameShape::new(3, 2);
    let values: Vec<f32> = (0..6).map(|v| v as f32 * 100.0).collect();
    let stack = stack_of(vec![frame_from_values(shape, values.clone())]);

    let grid = compute(&stack, &CancelFlag::new()).unwrap();
    let expected: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
    assert_eq!(grid.median().pixels(), expected.as_slice());
    assert!(grid.std_dev().pixels().iter().all(|&s| s == 0.0));
}

#[test]
fn test_identical_frames() {
    let shape = FrameShape::new(4, 3);
    let values: Vec<f32> = (0..12).map(|v| 1000.0 + v as f32).collect();
    let frames = (0..5)
        .map(|_| frame_from_values(shape, values.clone()))
        .collect();

    let grid = compute(&stack_of(frames), &CancelFlag::new()).unwrap();
    for (i, &median) in grid.median().pixels().iter().enumerate() {
        assert_eq!(median, f64::from(values[i]));
    }
    assert!(grid.std_dev().pixels().iter().all(|&s| s == 0.0));
}

#[test]
fn test_pixels_are_independent() {
    // Pixel (1, 0) varies across frames, everything else stays constant.
    let shape = FrameShape::new(2, 2);
    let frames = [1.0, 5.0, 9.0, 3.0]
        .into_iter()
        .map(|v| frame_from_values(shape, vec![7.0, v, 7.0, 7.0]))
        .collect();

    let grid = compute(&stack_of(frames), &CancelFlag::new()).unwrap();
    assert_eq!(grid.median()[(1, 0)], 4.0);
    assert_eq!(grid.median()[(0, 0)], 7.0);
    assert_eq!(grid.std_dev()[(0, 1)], 0.0);
    // mean 4.5, squared deviations 12.25 + 0.25 + 20.25 + 2.25 = 35
    assert!((grid.std_dev()[(1, 0)] - (35.0f64 / 4.0).sqrt()).abs() < EPSILON);
}

#[test]
fn test_nan_sample_only_affects_its_pixel() {
    let shape = FrameShape::new(2, 1);
    let stack = stack_of(vec![
        frame_from_values(shape, vec![f32::NAN, 1.0]),
        frame_from_values(shape, vec![2.0, 3.0]),
    ]);

    let grid = compute(&stack, &CancelFlag::new()).unwrap();
    assert!(grid.median()[(0, 0)].is_nan());
    assert!(grid.std_dev()[(0, 0)].is_nan());
    assert_eq!(grid.median()[(1, 0)], 2.0);
    assert_eq!(grid.std_dev()[(1, 0)], 1.0);
}

#[test]
fn test_chunked_matches_single_pass() {
    let shape = FrameShape::new(7, 13);
    let data = random_frames(shape, 6, 42);

    let whole = compute(&stack_of(as_frames(shape, &data)), &CancelFlag::new()).unwrap();
    let chunked = compute(
        &stack_of(as_frames(shape, &data)).with_chunk_rows(3),
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(whole, chunked);
}

#[test]
fn test_disk_backed_matches_in_memory() {
    let frames_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let shape = FrameShape::new(9, 70);
    let data = random_frames(shape, 4, 7);
    for (i, values) in data.iter().enumerate() {
        write_fits_u16(&frames_dir.path().join(format!("bias_{i}.fits")), shape, values);
    }

    let build = |storage: StorageMode, cache_dir: &Path| {
        let config = StackConfig {
            cache: CacheConfig {
                storage,
                // Forces the minimum chunk height, so 70 rows take two chunks.
                available_memory: Some(0),
                ..CacheConfig::with_cache_dir(cache_dir.to_path_buf())
            },
            ..Default::default()
        };
        let source = FrameSource::open(&FileSetSpec::Directory(frames_dir.path().to_path_buf()))
            .unwrap();
        StackBuilder::new(config)
            .build(&source, &CancelFlag::new())
            .unwrap()
    };

    let disk = build(StorageMode::DiskBacked, cache_dir.path());
    let memory = build(StorageMode::InMemory, cache_dir.path());
    assert!(disk.is_disk_backed());
    assert!(disk.chunk_rows() < shape.height);

    let from_disk = compute(&disk, &CancelFlag::new()).unwrap();
    let from_memory = compute(&memory, &CancelFlag::new()).unwrap();
    assert_eq!(from_disk, from_memory);

    // Spot check against a direct reduction of the source values.
    let mut column: Vec<f64> = data.iter().map(|f| f64::from(f[5])).collect();
    let (median, std_dev) = median_and_std_dev(&mut column);
    assert_eq!(from_memory.median().pixels()[5], median);
    assert_eq!(from_memory.std_dev().pixels()[5], std_dev);
}

#[test]
fn test_cancelled_compute() {
    let shape = FrameShape::new(2, 2);
    let stack = stack_of(vec![constant_frame(shape, 1.0)]);
    let cancel = CancelFlag::new();
    cancel.cancel();

    assert!(matches!(compute(&stack, &cancel), Err(Error::Cancelled)));
}

#[test]
fn test_stat_grid_shape_mismatch() {
    let err = PixelStatGrid::new(
        Grid::new_filled(FrameShape::new(2, 2), 0.0),
        Grid::new_filled(FrameShape::new(4, 1), 0.0),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

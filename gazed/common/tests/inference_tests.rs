use api::GazeModel;
use common::{clamp_to_viewport, GazeEstimator, GazePrediction, GazeTensor, InferenceError, TENSOR_SHAPE};
use glam::Vec2;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn fixed_tensor() -> GazeTensor {
    GazeTensor::from_parts(TENSOR_SHAPE, vec![0.0; TENSOR_SHAPE.iter().product()])
}

struct StubModel {
    output: Vec<f32>,
}

impl GazeModel for StubModel {
    fn input_shape(&self) -> [usize; 4] {
        TENSOR_SHAPE
    }

    fn run(&self, _input: &[f32]) -> anyhow::Result<Vec<f32>> {
        Ok(self.output.clone())
    }
}

/// Records whether two `run` calls ever overlapped in time.
struct ProbeModel {
    in_run: AtomicBool,
    overlapped: AtomicBool,
}

impl ProbeModel {
    fn new() -> Self {
        Self {
            in_run: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
        }
    }
}

impl GazeModel for ProbeModel {
    fn input_shape(&self) -> [usize; 4] {
        TENSOR_SHAPE
    }

    fn run(&self, _input: &[f32]) -> anyhow::Result<Vec<f32>> {
        if self.in_run.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(50));
        self.in_run.store(false, Ordering::SeqCst);
        Ok(vec![1.0, 2.0])
    }
}

/// Fails on the first N calls, then succeeds.
struct FlakyModel {
    calls: AtomicUsize,
    failures: usize,
}

impl GazeModel for FlakyModel {
    fn input_shape(&self) -> [usize; 4] {
        TENSOR_SHAPE
    }

    fn run(&self, _input: &[f32]) -> anyhow::Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            anyhow::bail!("transient backend failure #{}", call);
        }
        Ok(vec![5.0, 6.0])
    }
}

#[test]
fn test_model_not_ready_before_install() {
    let estimator = GazeEstimator::new();
    let err = estimator.predict(&fixed_tensor()).expect_err("no model yet");
    assert!(matches!(err, InferenceError::ModelNotReady));
}

#[test]
fn test_predict_maps_first_two_outputs() {
    let estimator = GazeEstimator::new();
    estimator
        .install_model(Box::new(StubModel {
            output: vec![320.5, 812.25, 7.0],
        }))
        .ok()
        .expect("first install succeeds");

    let prediction = estimator.predict(&fixed_tensor()).expect("predict");
    assert_eq!(prediction.x, 320.5);
    assert_eq!(prediction.y, 812.25);
}

#[test]
fn test_model_installs_only_once() {
    let estimator = GazeEstimator::new();
    assert!(estimator
        .install_model(Box::new(StubModel { output: vec![0.0, 0.0] }))
        .is_ok());
    assert!(estimator
        .install_model(Box::new(StubModel { output: vec![9.0, 9.0] }))
        .is_err());
    assert!(estimator.is_ready());
}

#[test]
fn test_concurrent_predictions_never_overlap() {
    let estimator = Arc::new(GazeEstimator::new());
    let probe = Arc::new(ProbeModel::new());

    struct SharedProbe(Arc<ProbeModel>);
    impl GazeModel for SharedProbe {
        fn input_shape(&self) -> [usize; 4] {
            self.0.input_shape()
        }
        fn run(&self, input: &[f32]) -> anyhow::Result<Vec<f32>> {
            self.0.run(input)
        }
    }

    estimator
        .install_model(Box::new(SharedProbe(probe.clone())))
        .ok()
        .expect("install");

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let estimator = estimator.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            estimator.predict(&fixed_tensor())
        }));
    }

    let mut ok = 0;
    let mut busy = 0;
    for handle in handles {
        match handle.join().expect("thread join") {
            Ok(_) => ok += 1,
            Err(InferenceError::Busy) => busy += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert!(!probe.overlapped.load(Ordering::SeqCst), "model re-entered");
    assert!(ok >= 1, "at least one prediction must succeed");
    assert_eq!(ok + busy, 2, "the loser is rejected, never run concurrently");
}

#[test]
fn test_transient_failure_retried_once() {
    let estimator = GazeEstimator::new();
    estimator
        .install_model(Box::new(FlakyModel {
            calls: AtomicUsize::new(0),
            failures: 1,
        }))
        .ok()
        .expect("install");

    let prediction = estimator.predict(&fixed_tensor()).expect("retry succeeds");
    assert_eq!(prediction.x, 5.0);
    assert_eq!(prediction.y, 6.0);
}

#[test]
fn test_persistent_failure_surfaces_after_one_retry() {
    let estimator = GazeEstimator::new();
    let calls = Arc::new(AtomicUsize::new(0));

    struct AlwaysFailing(Arc<AtomicUsize>);
    impl GazeModel for AlwaysFailing {
        fn input_shape(&self) -> [usize; 4] {
            TENSOR_SHAPE
        }
        fn run(&self, _input: &[f32]) -> anyhow::Result<Vec<f32>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("backend down")
        }
    }

    estimator
        .install_model(Box::new(AlwaysFailing(calls.clone())))
        .ok()
        .expect("install");

    let err = estimator.predict(&fixed_tensor()).expect_err("still failing");
    assert!(matches!(err, InferenceError::BackendFailure(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 2, "exactly one retry");
}

#[test]
fn test_shape_mismatch_is_not_retried() {
    let estimator = GazeEstimator::new();
    let calls = Arc::new(AtomicUsize::new(0));

    struct CountingOdd(Arc<AtomicUsize>);
    impl GazeModel for CountingOdd {
        fn input_shape(&self) -> [usize; 4] {
            [1, 95, 95, 4]
        }
        fn run(&self, _input: &[f32]) -> anyhow::Result<Vec<f32>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.0, 0.0])
        }
    }

    estimator
        .install_model(Box::new(CountingOdd(calls.clone())))
        .ok()
        .expect("install");

    let err = estimator.predict(&fixed_tensor()).expect_err("shape gate");
    assert!(matches!(
        err,
        InferenceError::ShapeMismatch {
            got: [1, 95, 190, 4],
            expected: [1, 95, 95, 4],
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0, "backend must never run");
}

#[test]
fn test_short_output_is_backend_failure() {
    let estimator = GazeEstimator::new();
    estimator
        .install_model(Box::new(StubModel { output: vec![1.0] }))
        .ok()
        .expect("install");

    let err = estimator.predict(&fixed_tensor()).expect_err("one scalar");
    assert!(matches!(err, InferenceError::BackendFailure(_)));
}

#[test]
fn test_clamp_keeps_pointer_on_screen() {
    let viewport = Vec2::new(1440.0, 900.0);
    let pointer = 40.0;

    let clamped = clamp_to_viewport(GazePrediction { x: -50.0, y: -10.0 }, viewport, pointer);
    assert_eq!(clamped, Vec2::new(0.0, 0.0));

    let clamped = clamp_to_viewport(GazePrediction { x: 2000.0, y: 1000.0 }, viewport, pointer);
    assert_eq!(clamped, Vec2::new(1400.0, 860.0));

    let clamped = clamp_to_viewport(GazePrediction { x: 720.0, y: 450.0 }, viewport, pointer);
    assert_eq!(clamped, Vec2::new(720.0, 450.0));
}

#[test]
fn test_clamp_degenerate_viewport_floors_at_zero() {
    // Pointer larger than the viewport: everything collapses to the origin.
    let clamped = clamp_to_viewport(
        GazePrediction { x: 10.0, y: 10.0 },
        Vec2::new(30.0, 30.0),
        40.0,
    );
    assert_eq!(clamped, Vec2::new(0.0, 0.0));
}

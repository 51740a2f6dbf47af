use super::*;
use crate::{
    foundation::core::CubeSize,
    pipeline::sink::InMemorySink,
    render::target::CpuCubeTarget,
};

/// Font bytes that are never shaped; every test here fails before text is drawn.
fn dummy_compositor() -> WatermarkCompositor {
    WatermarkCompositor::new(FontBytes {
        data: Arc::new(vec![0u8; 16]),
        index: 0,
    })
}

struct FailingRenderer;

impl CubeRenderer for FailingRenderer {
    fn render(
        &mut self,
        _pano: &PanoramaImage,
        _size: CubeSize,
    ) -> CubeResult<Box<dyn CubeRenderTarget>> {
        Err(CubeError::render("device lost"))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn live_targets(&self) -> usize {
        0
    }
}

/// Produces targets whose faces are too short for the requested size.
struct ShortReadbackRenderer;

impl CubeRenderer for ShortReadbackRenderer {
    fn render(
        &mut self,
        _pano: &PanoramaImage,
        size: CubeSize,
    ) -> CubeResult<Box<dyn CubeRenderTarget>> {
        let faces: [Vec<u8>; 6] = std::array::from_fn(|_| vec![0u8; 4]);
        Ok(Box::new(CpuCubeTarget::from_faces(size.get(), faces)))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn live_targets(&self) -> usize {
        0
    }
}

fn small_config() -> PipelineConfig {
    PipelineConfig {
        cube_size: CubeSize::new(8).unwrap(),
        ..PipelineConfig::default()
    }
}

fn blue_pano() -> PanoramaSource {
    PanoramaSource::Decoded(
        PanoramaImage::from_rgba8(4, 2, [0, 0, 255, 255].repeat(8), 1024).unwrap(),
    )
}

#[test]
fn new_orchestrator_is_idle() {
    let orch = Orchestrator::new(
        Box::new(crate::render::cpu::CpuCubeRenderer::new(RenderSettings::default())),
        dummy_compositor(),
    );
    assert_eq!(orch.state(), PipelineState::Idle);
    assert!(!orch.is_busy());
    assert_eq!(orch.live_render_targets(), 0);
}

#[test]
fn decode_failure_returns_to_idle() {
    let orch = Orchestrator::new(Box::new(FailingRenderer), dummy_compositor());
    let mut sink = InMemorySink::new();
    let req = RunRequest::new(
        PanoramaSource::Bytes(Arc::new(b"not an image".to_vec())),
        small_config(),
    );
    let err = orch.run(req, &mut sink).unwrap_err();
    assert!(matches!(err, CubeError::Decode(_)));
    assert_eq!(orch.state(), PipelineState::Idle);
    assert!(!orch.is_busy());
    assert!(sink.config().is_none());
}

#[test]
fn render_failure_is_fatal() {
    let orch = Orchestrator::new(Box::new(FailingRenderer), dummy_compositor());
    let mut sink = InMemorySink::new();
    let err = orch
        .run(RunRequest::new(blue_pano(), small_config()), &mut sink)
        .unwrap_err();
    assert!(matches!(err, CubeError::Render(_)));
    assert!(err.is_fatal());
    assert_eq!(orch.state(), PipelineState::Idle);
}

#[test]
fn readback_failure_names_the_face() {
    let orch = Orchestrator::new(Box::new(ShortReadbackRenderer), dummy_compositor());
    let mut sink = InMemorySink::new();
    let err = orch
        .run(RunRequest::new(blue_pano(), small_config()), &mut sink)
        .unwrap_err();
    match err {
        CubeError::Readback {
            face,
            expected,
            actual,
        } => {
            assert_eq!(face.get(), 0);
            assert_eq!(expected, 8 * 8 * 4);
            assert_eq!(actual, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(sink.faces().is_empty());
    assert!(!sink.ended());
    assert_eq!(orch.state(), PipelineState::Idle);
}

#[test]
fn cancelled_run_stops_before_rendering() {
    let orch = Orchestrator::new(Box::new(FailingRenderer), dummy_compositor());
    let cancel = CancelToken::new();
    cancel.cancel();
    let req = RunRequest::new(blue_pano(), small_config()).with_cancel(cancel);
    let err = orch.run(req, &mut InMemorySink::new()).unwrap_err();
    assert!(matches!(err, CubeError::Cancelled));
    assert_eq!(orch.state(), PipelineState::Idle);
}

#[test]
fn state_display_and_face() {
    let f = FaceIndex::new(2).unwrap();
    assert_eq!(PipelineState::Encode(f).to_string(), "encode(2)");
    assert_eq!(PipelineState::Publish(f).face(), Some(f));
    assert!(PipelineState::Rendering.is_active());
    assert!(!PipelineState::Done.is_active());
    assert_eq!(PipelineState::Idle.face(), None);
}

#[test]
fn thread_pool_rejects_zero_threads() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert!(build_thread_pool(Some(2)).is_ok());
}

#[test]
fn observer_sees_failed_run_return_to_idle() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let orch = Orchestrator::new(Box::new(FailingRenderer), dummy_compositor())
        .with_state_observer(Arc::new(move |s: PipelineState| record.lock().unwrap().push(s)));
    orch.run(RunRequest::new(blue_pano(), small_config()), &mut InMemorySink::new())
        .unwrap_err();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            PipelineState::Loading,
            PipelineState::Rendering,
            PipelineState::Idle
        ]
    );
}

//! Run state machine: decode, render, then extract/watermark/encode/publish each face in order.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::{Duration, Instant},
};

use crate::{
    assets::{font::FontBytes, logo::LogoHandle, panorama::PanoramaImage},
    effects::watermark::{WatermarkCompositor, WatermarkSpec, caption_text},
    encode::jpeg::{EncodedFace, EncodedFaces, FaceEncoder},
    extract::face::FaceExtractor,
    foundation::{
        cancel::CancelToken,
        core::{FaceIndex, Quality},
        error::{CubeError, CubeResult},
    },
    pipeline::{
        config::{PipelineConfig, UploadConfig},
        sink::{FaceSink, SinkConfig},
        state::{PipelineState, StateObserver},
        upload::{FaceUploader, RetryPolicy, UploadDispatcher, UploadOutcome},
    },
    render::{
        backend::{BackendKind, CubeRenderer, RenderSettings, create_renderer},
        target::CubeRenderTarget,
    },
};

/// Where the panorama for a run comes from.
#[derive(Clone, Debug)]
pub enum PanoramaSource {
    Path(PathBuf),
    /// Encoded image bytes (any format the `image` crate reads).
    Bytes(Arc<Vec<u8>>),
    Decoded(PanoramaImage),
}

/// Inputs of one run.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub panorama: PanoramaSource,
    pub config: PipelineConfig,
    /// Logo for face 3. When `None`, `config.logo` is loaded in the background.
    pub logo: Option<LogoHandle>,
    pub cancel: CancelToken,
}

impl RunRequest {
    pub fn new(panorama: PanoramaSource, config: PipelineConfig) -> Self {
        Self {
            panorama,
            config,
            logo: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_logo(mut self, logo: LogoHandle) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Summary of a completed run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// All six encoded faces, ready for archiving.
    pub faces: EncodedFaces,
    /// Per-face upload results, in dispatch order. Empty without an uploader.
    pub uploads: Vec<UploadOutcome>,
    /// Caption shared by every face of the run.
    pub caption: String,
    pub backend: BackendKind,
    pub elapsed: Duration,
}

/// Result of [`Orchestrator::run`].
#[derive(Clone, Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Another run was active; nothing was done.
    Ignored,
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed(r) => Some(r),
            Self::Ignored => None,
        }
    }

    pub fn into_report(self) -> Option<RunReport> {
        match self {
            Self::Completed(r) => Some(r),
            Self::Ignored => None,
        }
    }
}

/// Owns the renderer and runs at most one pipeline at a time.
pub struct Orchestrator {
    renderer: Mutex<Box<dyn CubeRenderer>>,
    compositor: WatermarkCompositor,
    extractor: FaceExtractor,
    encoder: FaceEncoder,
    uploader: Option<Arc<dyn FaceUploader>>,
    in_flight: AtomicBool,
    state: Mutex<PipelineState>,
    observer: Option<StateObserver>,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Read-only inputs shared by every face of a run.
struct FaceJob<'a> {
    target: &'a dyn CubeRenderTarget,
    size: u32,
    spec: &'a WatermarkSpec,
    logo: &'a LogoHandle,
    logo_wait: Duration,
    quality: Quality,
    cancel: &'a CancelToken,
    track_state: bool,
}

impl Orchestrator {
    pub fn new(renderer: Box<dyn CubeRenderer>, compositor: WatermarkCompositor) -> Self {
        Self {
            renderer: Mutex::new(renderer),
            compositor,
            extractor: FaceExtractor,
            encoder: FaceEncoder,
            uploader: None,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(PipelineState::Idle),
            observer: None,
        }
    }

    /// Build the renderer, font and (with the `upload` feature) HTTP uploader that `cfg` names.
    pub fn from_config(cfg: &PipelineConfig) -> CubeResult<Self> {
        cfg.validate()?;
        let renderer = create_renderer(cfg.backend, &RenderSettings::default())?;
        let font = FontBytes::resolve(cfg.font.as_deref())?;
        #[allow(unused_mut)]
        let mut orch = Self::new(renderer, WatermarkCompositor::new(font));

        if let Some(upload) = &cfg.upload {
            #[cfg(feature = "upload")]
            {
                let http = crate::pipeline::upload::HttpUploader::new(upload)?;
                tracing::info!(endpoint = http.endpoint(), "uploads enabled");
                orch = orch.with_uploader(Arc::new(http));
            }
            #[cfg(not(feature = "upload"))]
            {
                let _ = upload;
                tracing::warn!("upload configured but the `upload` feature is not compiled in");
            }
        }
        Ok(orch)
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn FaceUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Report each state transition to `observer`, e.g. for progress display.
    pub fn with_state_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a run is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Render targets still alive in the owned renderer.
    pub fn live_render_targets(&self) -> usize {
        self.renderer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .live_targets()
    }

    fn set_state(&self, next: PipelineState) {
        tracing::debug!(state = %next, "pipeline state");
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
        if let Some(observer) = &self.observer {
            observer(next);
        }
    }

    /// Run the pipeline, publishing each face to `sink` as it completes.
    ///
    /// Returns [`RunOutcome::Ignored`] without side effects when another run is active.
    /// Fatal errors return the orchestrator to `Idle`; upload and logo failures are only logged.
    #[tracing::instrument(level = "info", skip_all, fields(cube_size = request.config.cube_size.get()))]
    pub fn run(&self, request: RunRequest, sink: &mut dyn FaceSink) -> CubeResult<RunOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("run already in flight, start request ignored");
            return Ok(RunOutcome::Ignored);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let started = Instant::now();
        match self.run_inner(request, sink, started) {
            Ok(report) => {
                self.set_state(PipelineState::Done);
                tracing::info!(
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    faces = report.faces.len(),
                    uploads_failed = report.uploads.iter().filter(|u| !u.succeeded()).count(),
                    "run complete"
                );
                Ok(RunOutcome::Completed(report))
            }
            Err(e) => {
                self.set_state(PipelineState::Idle);
                tracing::error!(error = %e, "run failed");
                Err(e)
            }
        }
    }

    fn run_inner(
        &self,
        request: RunRequest,
        sink: &mut dyn FaceSink,
        started: Instant,
    ) -> CubeResult<RunReport> {
        let RunRequest {
            panorama,
            config,
            logo,
            cancel,
        } = request;

        self.set_state(PipelineState::Loading);
        config.validate()?;
        cancel.check()?;

        let logo = match (logo, &config.logo) {
            (Some(handle), _) => handle,
            (None, Some(path)) => LogoHandle::spawn_load(path.clone()),
            (None, None) => LogoHandle::unavailable(),
        };

        let pano = load_panorama(panorama)?;
        cancel.check()?;

        // Source size is measured once and shared by every face's caption.
        let spec = WatermarkSpec {
            text: config.watermark_text.clone(),
            quality: config.quality,
            source_len: pano.source_len,
        };
        let size = config.cube_size;

        let dispatcher = match &self.uploader {
            Some(uploader) => Some(UploadDispatcher::spawn(
                Arc::clone(uploader),
                config
                    .upload
                    .as_ref()
                    .map(RetryPolicy::from)
                    .unwrap_or_else(|| RetryPolicy::from(&UploadConfig::default())),
                cancel.clone(),
            )?),
            None => None,
        };

        self.set_state(PipelineState::Rendering);
        let (target, backend) = {
            let mut renderer = self.renderer.lock().unwrap_or_else(|e| e.into_inner());
            (renderer.render(&pano, size)?, renderer.kind())
        };
        cancel.check()?;

        let job = FaceJob {
            target: target.as_ref(),
            size: size.get(),
            spec: &spec,
            logo: &logo,
            logo_wait: Duration::from_millis(config.logo_wait_ms),
            quality: config.quality,
            cancel: &cancel,
            track_state: !config.parallel,
        };

        sink.begin(SinkConfig {
            cube_size: size.get(),
            quality: config.quality,
        })?;

        let mut faces = EncodedFaces::new();
        let mut publish = |face: EncodedFace| -> CubeResult<()> {
            self.set_state(PipelineState::Publish(face.face));
            sink.publish(&face)?;
            if let Some(d) = &dispatcher {
                d.dispatch(face.clone());
            }
            faces.insert(face)
        };

        if config.parallel {
            let pool = build_thread_pool(config.threads)?;
            self.process_parallel(&job, &pool, &mut publish)?;
        } else {
            for face in FaceIndex::ALL {
                let encoded = self.process_face(&job, face)?;
                publish(encoded)?;
            }
        }
        drop(publish);
        drop(target);

        sink.end()?;
        let uploads = dispatcher.map(UploadDispatcher::finish).unwrap_or_default();

        Ok(RunReport {
            faces,
            uploads,
            caption: caption_text(size.get(), size.get(), spec.source_len, spec.quality),
            backend,
            elapsed: started.elapsed(),
        })
    }

    /// Process faces concurrently and publish them strictly in index order.
    fn process_parallel(
        &self,
        job: &FaceJob<'_>,
        pool: &rayon::ThreadPool,
        publish: &mut dyn FnMut(EncodedFace) -> CubeResult<()>,
    ) -> CubeResult<()> {
        let (tx, rx) = mpsc::channel::<(FaceIndex, CubeResult<EncodedFace>)>();
        pool.in_place_scope(|scope| {
            for face in FaceIndex::ALL {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let _ = tx.send((face, self.process_face(job, face)));
                });
            }
            drop(tx);

            let mut pending: [Option<EncodedFace>; FaceIndex::COUNT] = Default::default();
            let mut next = 0usize;
            for (face, result) in rx {
                pending[face.as_usize()] = Some(result?);
                while next < FaceIndex::COUNT {
                    let Some(ready) = pending[next].take() else {
                        break;
                    };
                    publish(ready)?;
                    next += 1;
                }
            }
            if next != FaceIndex::COUNT {
                return Err(CubeError::render(format!(
                    "parallel face processing stopped after {next} faces"
                )));
            }
            Ok(())
        })
    }

    fn process_face(&self, job: &FaceJob<'_>, face: FaceIndex) -> CubeResult<EncodedFace> {
        job.cancel.check()?;

        if job.track_state {
            self.set_state(PipelineState::ExtractFace(face));
        }
        let mut raster = self.extractor.extract(job.target, face, job.size, job.size)?;

        if job.track_state {
            self.set_state(PipelineState::Watermark(face));
        }
        let logo = if face.is_logo_face() {
            if job.logo_wait.is_zero() {
                job.logo.poll()
            } else {
                job.logo.wait(job.logo_wait)
            }
        } else {
            None
        };
        if face.is_logo_face() && logo.is_none() {
            tracing::debug!("logo not ready, overlay omitted");
        }
        self.compositor
            .composite(&mut raster, face, job.spec, logo.as_deref())?;

        job.cancel.check()?;
        if job.track_state {
            self.set_state(PipelineState::Encode(face));
        }
        let bytes = self.encoder.encode(&raster, job.quality)?;

        Ok(EncodedFace {
            face,
            bytes,
            width: raster.width,
            height: raster.height,
            caption: caption_text(
                raster.width,
                raster.height,
                job.spec.source_len,
                job.spec.quality,
            ),
        })
    }
}

fn load_panorama(source: PanoramaSource) -> CubeResult<PanoramaImage> {
    match source {
        PanoramaSource::Path(path) => PanoramaImage::open(&path),
        PanoramaSource::Bytes(bytes) => PanoramaImage::decode(&bytes),
        PanoramaSource::Decoded(pano) => Ok(pano),
    }
}

fn build_thread_pool(threads: Option<usize>) -> CubeResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(CubeError::validation("threads must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("panocube-face-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CubeError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;

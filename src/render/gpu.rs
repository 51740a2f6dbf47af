use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{
    assets::panorama::PanoramaImage,
    foundation::{
        core::{CubeSize, FaceIndex},
        error::{CubeError, CubeResult},
    },
    render::{
        backend::{BackendKind, CubeRenderer, RenderSettings},
        projection::{FaceBasis, RAW_FACE_BASIS},
        target::CubeRenderTarget,
    },
};

const UNIFORM_BYTES: u64 = 80;

struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: wgpu::Buffer,
}

/// wgpu cube renderer: six render passes into the layers of a 2D array texture.
pub struct GpuCubeRenderer {
    settings: RenderSettings,
    gpu: Option<Gpu>,
    live: Arc<AtomicUsize>,
}

impl GpuCubeRenderer {
    pub fn new(settings: RenderSettings) -> CubeResult<Self> {
        Ok(Self {
            settings,
            gpu: None,
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn ensure_init(&mut self) -> CubeResult<&Gpu> {
        if self.gpu.is_none() {
            self.gpu = Some(init_gpu()?);
        }
        self.gpu
            .as_ref()
            .ok_or_else(|| CubeError::render("gpu backend not initialized"))
    }
}

fn init_gpu() -> CubeResult<Gpu> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .map_err(|e| match e {
        wgpu::RequestAdapterError::NotFound { .. } => {
            CubeError::render("no gpu adapter available")
        }
        other => CubeError::render(format!("wgpu request_adapter failed: {other:?}")),
    })?;

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("panocube"),
        required_features: wgpu::Features::empty(),
        required_limits: adapter.limits(),
        experimental_features: wgpu::ExperimentalFeatures::default(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::Off,
    }))
    .map_err(|e| CubeError::render(format!("wgpu request_device failed: {e:?}")))?;

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("panocube_equirect_sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("panocube_face_uniforms"),
        size: UNIFORM_BYTES,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("panocube_face_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_BYTES),
                },
                count: None,
            },
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("panocube_face_shader"),
        source: wgpu::ShaderSource::Wgsl(FACE_SHADER.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("panocube_face_pl"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("panocube_face_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: wgpu::TextureFormat::Rgba8Unorm,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Ok(Gpu {
        device,
        queue,
        pipeline,
        bind_group_layout,
        sampler,
        uniforms,
    })
}

const FACE_SHADER: &str = r#"
struct Face {
  forward: vec4<f32>,
  right: vec4<f32>,
  up: vec4<f32>,
  clip: vec4<f32>,
  clear: vec4<f32>,
};

struct VsOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) ndc: vec2<f32>,
};

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> VsOut {
  var p = array<vec2<f32>, 3>(
    vec2<f32>(-1.0, -1.0),
    vec2<f32>( 3.0, -1.0),
    vec2<f32>(-1.0,  3.0),
  );
  var o: VsOut;
  o.pos = vec4<f32>(p[vi], 0.0, 1.0);
  o.ndc = p[vi];
  return o;
}

@group(0) @binding(0) var t_pano: texture_2d<f32>;
@group(0) @binding(1) var s_pano: sampler;
@group(0) @binding(2) var<uniform> face: Face;

const PI: f32 = 3.14159265358979;

@fragment
fn fs(in: VsOut) -> @location(0) vec4<f32> {
  let dir = normalize(face.forward.xyz + in.ndc.x * face.right.xyz + in.ndc.y * face.up.xyz);
  let depth = face.clip.z * dot(dir, face.forward.xyz);
  if (depth < face.clip.x || depth > face.clip.y) {
    return face.clear;
  }
  let lon = atan2(dir.x, -dir.z);
  let lat = asin(clamp(dir.y, -1.0, 1.0));
  let uv = vec2<f32>(0.5 + lon / (2.0 * PI), 0.5 - lat / PI);
  return textureSampleLevel(t_pano, s_pano, uv, 0.0);
}
"#;

fn face_uniforms(basis: &FaceBasis, settings: &RenderSettings) -> [u8; UNIFORM_BYTES as usize] {
    let c = settings.clear_rgba;
    let values: [f32; 20] = [
        basis.forward[0] as f32,
        basis.forward[1] as f32,
        basis.forward[2] as f32,
        0.0,
        basis.right[0] as f32,
        basis.right[1] as f32,
        basis.right[2] as f32,
        0.0,
        basis.up[0] as f32,
        basis.up[1] as f32,
        basis.up[2] as f32,
        0.0,
        settings.camera.near as f32,
        settings.camera.far as f32,
        settings.sphere.radius as f32,
        0.0,
        f32::from(c[0]) / 255.0,
        f32::from(c[1]) / 255.0,
        f32::from(c[2]) / 255.0,
        f32::from(c[3]) / 255.0,
    ];
    let mut out = [0u8; UNIFORM_BYTES as usize];
    for (dst, v) in out.chunks_exact_mut(4).zip(values) {
        dst.copy_from_slice(&v.to_le_bytes());
    }
    out
}

fn upload_panorama(gpu: &Gpu, pano: &PanoramaImage) -> CubeResult<wgpu::Texture> {
    let max = gpu.device.limits().max_texture_dimension_2d;
    let (width, height, pixels) = if pano.width > max || pano.height > max {
        let scale = f64::from(max) / f64::from(pano.width.max(pano.height));
        let w = ((f64::from(pano.width) * scale).floor() as u32).max(1);
        let h = ((f64::from(pano.height) * scale).floor() as u32).max(1);
        tracing::warn!(
            from_w = pano.width,
            from_h = pano.height,
            to_w = w,
            to_h = h,
            "panorama exceeds gpu texture limit; downscaling"
        );
        let src = image::RgbaImage::from_raw(pano.width, pano.height, pano.rgba8.to_vec())
            .ok_or_else(|| CubeError::render("panorama buffer does not match its size"))?;
        let scaled = image::imageops::resize(&src, w, h, image::imageops::FilterType::Triangle);
        (w, h, std::borrow::Cow::Owned(scaled.into_raw()))
    } else {
        (
            pano.width,
            pano.height,
            std::borrow::Cow::Borrowed(pano.rgba8.as_slice()),
        )
    };

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("panocube_equirect"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );
    Ok(texture)
}

/// Run `f` inside out-of-memory and validation error scopes, so device errors come back as
/// [`CubeError::Render`] instead of reaching the uncaptured-error handler.
fn capture_gpu_errors<T>(
    device: &wgpu::Device,
    what: &str,
    f: impl FnOnce() -> CubeResult<T>,
) -> CubeResult<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = f();
    let validation = pollster::block_on(device.pop_error_scope());
    let oom = pollster::block_on(device.pop_error_scope());
    match oom.or(validation) {
        Some(e) => Err(CubeError::render(format!("{what}: {e}"))),
        None => result,
    }
}

fn create_cube_texture(gpu: &Gpu, n: u32) -> wgpu::Texture {
    gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("panocube_cube_target"),
        size: wgpu::Extent3d {
            width: n,
            height: n,
            depth_or_array_layers: FaceIndex::COUNT as u32,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn draw_faces(
    gpu: &Gpu,
    settings: &RenderSettings,
    equirect: &wgpu::Texture,
    cube: &wgpu::Texture,
) {
    let equirect_view = equirect.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("panocube_face_bg"),
        layout: &gpu.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&equirect_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&gpu.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: gpu.uniforms.as_entire_binding(),
            },
        ],
    });

    for (layer, basis) in RAW_FACE_BASIS.iter().enumerate() {
        let layer_view = cube.create_view(&wgpu::TextureViewDescriptor {
            label: Some("panocube_cube_layer"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: layer as u32,
            array_layer_count: Some(1),
            ..Default::default()
        });
        gpu.queue
            .write_buffer(&gpu.uniforms, 0, &face_uniforms(basis, settings));

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("panocube_face_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("panocube_face_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &layer_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&gpu.pipeline);
            rp.set_bind_group(0, &bind_group, &[]);
            rp.draw(0..3, 0..1);
        }
        // Uniform writes land at submit, so each face goes out on its own.
        gpu.queue.submit(Some(encoder.finish()));
    }
}

impl CubeRenderer for GpuCubeRenderer {
    #[tracing::instrument(level = "debug", skip_all, fields(size = size.get()))]
    fn render(
        &mut self,
        pano: &PanoramaImage,
        size: CubeSize,
    ) -> CubeResult<Box<dyn CubeRenderTarget>> {
        let settings = self.settings;
        let live = Arc::clone(&self.live);
        let gpu = self.ensure_init()?;
        let n = size.get();
        if n > gpu.device.limits().max_texture_dimension_2d {
            return Err(CubeError::render(format!(
                "cube size {n} exceeds gpu texture limit {}",
                gpu.device.limits().max_texture_dimension_2d
            )));
        }

        let equirect = capture_gpu_errors(&gpu.device, "upload panorama", || {
            upload_panorama(gpu, pano)
        })?;
        let cube = match capture_gpu_errors(&gpu.device, "allocate cube target", || {
            Ok(create_cube_texture(gpu, n))
        }) {
            Ok(cube) => cube,
            Err(e) => {
                equirect.destroy();
                return Err(e);
            }
        };

        let drawn = capture_gpu_errors(&gpu.device, "render cube faces", || {
            draw_faces(gpu, &settings, &equirect, &cube);
            Ok(())
        });
        equirect.destroy();
        if let Err(e) = drawn {
            cube.destroy();
            return Err(e);
        }

        live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(GpuCubeTarget {
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            texture: cube,
            size: n,
            live,
        }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn live_targets(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Device-resident cube target; the texture is destroyed on drop.
pub struct GpuCubeTarget {
    device: wgpu::Device,
    queue: wgpu::Queue,
    texture: wgpu::Texture,
    size: u32,
    live: Arc<AtomicUsize>,
}

impl CubeRenderTarget for GpuCubeTarget {
    fn size(&self) -> u32 {
        self.size
    }

    fn read_face_rgba8(&self, face: FaceIndex) -> CubeResult<Vec<u8>> {
        let n = self.size;
        let row_bytes = n
            .checked_mul(4)
            .ok_or_else(|| CubeError::render("cube face width overflow"))?;
        let padded_row_bytes = align_to(row_bytes, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer_size = u64::from(padded_row_bytes) * u64::from(n);

        let readback = capture_gpu_errors(&self.device, "read back cube face", || {
            let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("panocube_face_readback"),
                size: buffer_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("panocube_readback_encoder"),
                });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &self.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: u32::from(face.get()),
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &readback,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_row_bytes),
                        rows_per_image: Some(n),
                    },
                },
                wgpu::Extent3d {
                    width: n,
                    height: n,
                    depth_or_array_layers: 1,
                },
            );
            self.queue.submit(Some(encoder.finish()));
            Ok(readback)
        })?;

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| CubeError::render(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| CubeError::render("readback channel closed"))?
            .map_err(|e| CubeError::render(format!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        let row_bytes = row_bytes as usize;
        let padded_row_bytes = padded_row_bytes as usize;
        let mut out = Vec::with_capacity(row_bytes * n as usize);
        for row in 0..n as usize {
            let start = row * padded_row_bytes;
            out.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        readback.unmap();
        readback.destroy();
        Ok(out)
    }
}

impl Drop for GpuCubeTarget {
    fn drop(&mut self) {
        self.texture.destroy();
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

#[cfg(test)]
#[path = "../../tests/unit/render/gpu.rs"]
mod tests;

pub mod geometry;
pub mod helpers;

use geometry::{ColorVertex, PointInstance};
use glam::{Mat4, Vec3};
use helpers::PipelineSpec;
use wander_core::constants::{hsl_to_rgb, PLANE_SEGMENTS, PLANE_SIZE, POINT_BASE_HSL};
use wander_core::{BeamVisual, RingVisual, SceneCommand, SceneSink, SketchVisual};
use web_sys as web;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    cam_right: [f32; 4],
    cam_up: [f32; 4],
}

const INITIAL_LINE_CAPACITY: usize = 4096;

/// WebGPU renderer for the terrain, the point cloud and line overlays (ring,
/// beam, sketch paths). Receives the frame through [`SceneSink`].
pub struct GpuState<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,

    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    terrain_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,

    terrain_vbuf: wgpu::Buffer,
    terrain_ibuf: wgpu::Buffer,
    terrain_index_count: u32,
    quad_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
    line_buffer: wgpu::Buffer,
    line_capacity: usize,
    line_vertices: Vec<ColorVertex>,

    width: u32,
    height: u32,
    clear_color: wgpu::Color,
    view_proj: Mat4,
    cam_eye: Vec3,
    cam_target: Vec3,
    ring: Option<RingVisual>,
    beam: Option<BeamVisual>,
    sketches: Vec<SketchVisual>,
}

impl<'a> GpuState<'a> {
    pub async fn new(
        canvas: &'a web::HtmlCanvasElement,
        positions: &[Vec3],
        plane_heights: &[f32],
    ) -> anyhow::Result<Self> {
        let width = canvas.width();
        let height = canvas.height();

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let (_, depth_view) = helpers::create_depth_texture(&device, width, height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(wander_core::SCENE_WGSL.into()),
        });
        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bg"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let color_layout = [helpers::color_vertex_layout()];
        let point_layouts = helpers::point_buffer_layouts();
        let terrain_pipeline = helpers::make_scene_pipeline(
            &device,
            &layout,
            &shader,
            format,
            PipelineSpec {
                label: "terrain_pipeline",
                vs_entry: "vs_color",
                fs_entry: "fs_color",
                buffers: &color_layout,
                topology: wgpu::PrimitiveTopology::TriangleList,
                blend: None,
                depth_write: true,
            },
        );
        let point_pipeline = helpers::make_scene_pipeline(
            &device,
            &layout,
            &shader,
            format,
            PipelineSpec {
                label: "point_pipeline",
                vs_entry: "vs_points",
                fs_entry: "fs_points",
                buffers: &point_layouts,
                topology: wgpu::PrimitiveTopology::TriangleList,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                depth_write: true,
            },
        );
        let line_pipeline = helpers::make_scene_pipeline(
            &device,
            &layout,
            &shader,
            format,
            PipelineSpec {
                label: "line_pipeline",
                vs_entry: "vs_color",
                fs_entry: "fs_color",
                buffers: &color_layout,
                topology: wgpu::PrimitiveTopology::LineList,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                depth_write: false,
            },
        );

        let (terrain_vertices, terrain_indices) =
            geometry::terrain_mesh(plane_heights, PLANE_SEGMENTS, PLANE_SIZE);
        let terrain_vbuf = init_buffer(
            &device,
            "terrain_vertices",
            bytemuck::cast_slice(&terrain_vertices),
            wgpu::BufferUsages::VERTEX,
        );
        let terrain_ibuf = init_buffer(
            &device,
            "terrain_indices",
            bytemuck::cast_slice(&terrain_indices),
            wgpu::BufferUsages::INDEX,
        );
        let quad_buffer = init_buffer(
            &device,
            "quad_corners",
            bytemuck::cast_slice(&helpers::QUAD_CORNERS),
            wgpu::BufferUsages::VERTEX,
        );
        let instances = geometry::point_instances(positions, hsl_to_rgb(POINT_BASE_HSL));
        let instance_buffer = init_buffer(
            &device,
            "point_instances",
            bytemuck::cast_slice(&instances),
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        );
        let line_buffer = line_buffer(&device, INITIAL_LINE_CAPACITY);
        log::info!(
            "[render] {}x{} {:?}, {} points, {} terrain triangles",
            width,
            height,
            format,
            instances.len(),
            terrain_indices.len() / 3
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            uniform_buffer,
            bind_group,
            terrain_pipeline,
            point_pipeline,
            line_pipeline,
            terrain_vbuf,
            terrain_ibuf,
            terrain_index_count: terrain_indices.len() as u32,
            quad_buffer,
            instance_buffer,
            instance_count: instances.len() as u32,
            line_buffer,
            line_capacity: INITIAL_LINE_CAPACITY,
            line_vertices: Vec::with_capacity(INITIAL_LINE_CAPACITY),
            width,
            height,
            clear_color: wgpu::Color::BLACK,
            view_proj: Mat4::IDENTITY,
            cam_eye: Vec3::ZERO,
            cam_target: Vec3::NEG_Z,
            ring: None,
            beam: None,
            sketches: Vec::new(),
        })
    }

    pub fn resize_if_needed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.reconfigure();
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    fn reconfigure(&mut self) {
        self.config.width = self.width.max(1);
        self.config.height = self.height.max(1);
        self.surface.configure(&self.device, &self.config);
        let (_, depth_view) = helpers::create_depth_texture(&self.device, self.width, self.height);
        self.depth_view = depth_view;
    }

    fn upload_terrain(&mut self, plane_heights: &[f32]) {
        let (vertices, indices) = geometry::terrain_mesh(plane_heights, PLANE_SEGMENTS, PLANE_SIZE);
        if indices.is_empty() {
            log::warn!("[render] terrain update with {} heights ignored", plane_heights.len());
            return;
        }
        self.terrain_vbuf = init_buffer(
            &self.device,
            "terrain_vertices",
            bytemuck::cast_slice(&vertices),
            wgpu::BufferUsages::VERTEX,
        );
        self.terrain_ibuf = init_buffer(
            &self.device,
            "terrain_indices",
            bytemuck::cast_slice(&indices),
            wgpu::BufferUsages::INDEX,
        );
        self.terrain_index_count = indices.len() as u32;
    }

    fn write_point_colors(&mut self, updates: &[(u32, [f32; 3])]) {
        for &(index, [r, g, b]) in updates {
            if index >= self.instance_count {
                continue;
            }
            self.queue.write_buffer(
                &self.instance_buffer,
                geometry::point_color_offset(index),
                bytemuck::bytes_of(&[r, g, b, 1.0f32]),
            );
        }
    }

    fn upload_lines(&mut self, time: f32) -> u32 {
        self.line_vertices.clear();
        if let Some(ring) = &self.ring {
            geometry::ring_lines(&mut self.line_vertices, ring);
        }
        if let Some(beam) = &self.beam {
            geometry::beam_lines(&mut self.line_vertices, beam);
        }
        for sketch in &self.sketches {
            geometry::sketch_lines(&mut self.line_vertices, sketch, time);
        }
        if self.line_vertices.len() > self.line_capacity {
            self.line_capacity = self.line_vertices.len().next_power_of_two();
            self.line_buffer = line_buffer(&self.device, self.line_capacity);
        }
        if !self.line_vertices.is_empty() {
            self.queue.write_buffer(
                &self.line_buffer,
                0,
                bytemuck::cast_slice(&self.line_vertices),
            );
        }
        self.line_vertices.len() as u32
    }

    fn uniforms(&self) -> SceneUniforms {
        let forward = (self.cam_target - self.cam_eye).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        SceneUniforms {
            view_proj: self.view_proj.to_cols_array_2d(),
            cam_right: right.extend(0.0).to_array(),
            cam_up: up.extend(0.0).to_array(),
        }
    }

    pub fn render(&mut self, time: f32) -> Result<(), wgpu::SurfaceError> {
        let line_count = self.upload_lines(time);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms()));

        let frame = match self.surface.get_current_texture() {
            Ok(f) => f,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                self.surface.get_current_texture()?
            }
            Err(e) => return Err(e),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_bind_group(0, &self.bind_group, &[]);

            if self.terrain_index_count > 0 {
                rpass.set_pipeline(&self.terrain_pipeline);
                rpass.set_vertex_buffer(0, self.terrain_vbuf.slice(..));
                rpass.set_index_buffer(self.terrain_ibuf.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..self.terrain_index_count, 0, 0..1);
            }
            if self.instance_count > 0 {
                rpass.set_pipeline(&self.point_pipeline);
                rpass.set_vertex_buffer(0, self.quad_buffer.slice(..));
                rpass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                rpass.draw(0..helpers::QUAD_CORNERS.len() as u32, 0..self.instance_count);
            }
            if line_count > 0 {
                rpass.set_pipeline(&self.line_pipeline);
                rpass.set_vertex_buffer(0, self.line_buffer.slice(..));
                rpass.draw(0..line_count, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl SceneSink for GpuState<'_> {
    fn apply(&mut self, command: SceneCommand) {
        match command {
            SceneCommand::Camera {
                view_proj,
                eye,
                target,
            } => {
                self.view_proj = view_proj;
                self.cam_eye = eye;
                self.cam_target = target;
            }
            SceneCommand::PointColors(updates) => self.write_point_colors(&updates),
            SceneCommand::Ring(ring) => self.ring = ring,
            SceneCommand::Beam(beam) => self.beam = beam,
            SceneCommand::Sketches(sketches) => self.sketches = sketches,
            SceneCommand::Terrain(heights) => self.upload_terrain(&heights),
        }
    }
}

// Buffers are never zero-sized; an empty asset still gets one element of room.
fn init_buffer(
    device: &wgpu::Device,
    label: &str,
    contents: &[u8],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    if contents.is_empty() {
        return device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<PointInstance>() as u64,
            usage,
            mapped_at_creation: false,
        });
    }
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage,
    })
}

fn line_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("overlay_lines"),
        size: (capacity * std::mem::size_of::<ColorVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

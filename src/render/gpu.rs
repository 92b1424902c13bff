use anyhow::{Context, Result};
use bytemuck::{bytes_of, Pod};
use wgpu::util::DeviceExt;

use crate::obj::Mesh;
use crate::render::shaders::{GRID_SHADER, LIGHTING_SHADER};
use crate::render::uniforms::{GridUniform, LightingGlobals, ObjectUniform};
use crate::texture::Texture2D;
use crate::vertex::Vertex;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Float32x3,
    4 => Float32x3
];

/// Number of material maps bound per draw, in binding order.
pub const MATERIAL_MAP_COUNT: usize = 5;

/// Acquires a device without any surface, for offscreen rendering.
pub async fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: Default::default(),
        backend_options: Default::default(),
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .context("failed to acquire GPU adapter")?;

    // line rasterization is optional; wireframe draws need it
    let device_descriptor = wgpu::DeviceDescriptor {
        label: Some("gridlight-device"),
        required_features: adapter.features() & wgpu::Features::POLYGON_MODE_LINE,
        required_limits: wgpu::Limits::downlevel_defaults(),
        experimental_features: Default::default(),
        memory_hints: Default::default(),
        trace: Default::default(),
    };
    adapter
        .request_device(&device_descriptor)
        .await
        .context("failed to create GPU device")
}

/// Uniform buffer together with the bind group exposing it.
pub struct UniformBinding {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl UniformBinding {
    fn new<T: Pod>(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, value: &T, label: &str) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes_of(value),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    /// Rewrites the buffer contents before the next submission.
    pub fn update<T: Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytes_of(value));
    }
}

/// Vertex and index buffers of one mesh.
pub struct GpuMesh {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    pub fn from_mesh(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Sampled texture uploaded from a [`Texture2D`].
pub struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn from_texture(device: &wgpu::Device, queue: &wgpu::Queue, texture: &Texture2D, label: &str) -> Self {
        let gpu = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: texture.width(),
                    height: texture.height(),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &texture.to_rgba8(),
        );
        let view = gpu.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: gpu,
            view,
        }
    }
}

pub struct DepthBuffer {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

fn uniform_layout<T>(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
            },
            count: None,
        }],
    })
}

fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries: Vec<_> = (0..MATERIAL_MAP_COUNT as u32)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        })
        .collect();
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: MATERIAL_MAP_COUNT as u32,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("material-bind-layout"),
        entries: &entries,
    })
}

fn depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DepthBuffer::FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: Default::default(),
        bias: Default::default(),
    }
}

/// Lighting and grid pipelines plus the layouts their bind groups use.
pub struct GpuPipelines {
    lighting: wgpu::RenderPipeline,
    lighting_lines: Option<wgpu::RenderPipeline>,
    grid: wgpu::RenderPipeline,
    globals_layout: wgpu::BindGroupLayout,
    object_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    grid_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    placeholder: GpuTexture,
}

impl GpuPipelines {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let globals_layout = uniform_layout::<LightingGlobals>(device, "lighting-globals-layout");
        let object_layout = uniform_layout::<ObjectUniform>(device, "object-bind-layout");
        let grid_layout = uniform_layout::<GridUniform>(device, "grid-bind-layout");
        let material_layout = material_layout(device);

        let color_targets = [Some(wgpu::ColorTargetState {
            format: color_format,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let lighting_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lighting-shader"),
            source: wgpu::ShaderSource::Wgsl(LIGHTING_SHADER.into()),
        });
        let lighting_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lighting-pipeline-layout"),
            bind_group_layouts: &[&globals_layout, &object_layout, &material_layout],
            push_constant_ranges: &[],
        });
        let lighting_pipeline = |label: &str, polygon_mode: wgpu::PolygonMode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&lighting_layout),
                vertex: wgpu::VertexState {
                    module: &lighting_shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    }],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(depth_state()),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &lighting_shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &color_targets,
                }),
                multiview: None,
                cache: None,
            })
        };
        let lighting = lighting_pipeline("lighting-pipeline", wgpu::PolygonMode::Fill);
        let lighting_lines = device
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE)
            .then(|| lighting_pipeline("lighting-line-pipeline", wgpu::PolygonMode::Line));

        let grid_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grid-shader"),
            source: wgpu::ShaderSource::Wgsl(GRID_SHADER.into()),
        });
        let grid_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grid-pipeline-layout"),
            bind_group_layouts: &[&grid_layout],
            push_constant_ranges: &[],
        });
        let grid = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("grid-pipeline"),
            layout: Some(&grid_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &grid_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(depth_state()),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &grid_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &color_targets,
            }),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let placeholder = GpuTexture::from_texture(
            device,
            queue,
            &Texture2D::solid(glam::Vec4::ONE),
            "placeholder-texture",
        );

        Self {
            lighting,
            lighting_lines,
            grid,
            globals_layout,
            object_layout,
            material_layout,
            grid_layout,
            sampler,
            placeholder,
        }
    }

    pub fn globals_binding(&self, device: &wgpu::Device, globals: &LightingGlobals) -> UniformBinding {
        UniformBinding::new(device, &self.globals_layout, globals, "lighting-globals")
    }

    pub fn object_binding(&self, device: &wgpu::Device, object: &ObjectUniform) -> UniformBinding {
        UniformBinding::new(device, &self.object_layout, object, "object-uniform")
    }

    pub fn grid_binding(&self, device: &wgpu::Device, grid: &GridUniform) -> UniformBinding {
        UniformBinding::new(device, &self.grid_layout, grid, "grid-uniform")
    }

    /// Binds material maps in the order diffuse, specular, ambient,
    /// emission, normal. Unbound slots get a white placeholder.
    pub fn material_bind_group(
        &self,
        device: &wgpu::Device,
        maps: [Option<&GpuTexture>; MATERIAL_MAP_COUNT],
    ) -> wgpu::BindGroup {
        let mut entries: Vec<_> = maps
            .iter()
            .enumerate()
            .map(|(binding, map)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(&map.unwrap_or(&self.placeholder).view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: MATERIAL_MAP_COUNT as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material-bind-group"),
            layout: &self.material_layout,
            entries: &entries,
        })
    }

    /// Records one lit mesh draw.
    pub fn draw_mesh(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        mesh: &GpuMesh,
        globals: &UniformBinding,
        object: &UniformBinding,
        material: &wgpu::BindGroup,
    ) {
        self.record_mesh(&self.lighting, pass, mesh, globals, object, material);
    }

    pub fn supports_wireframe(&self) -> bool {
        self.lighting_lines.is_some()
    }

    /// Records the triangle edges of a mesh. The object uniform should
    /// carry [`Material::wireframe_override`] colors. Returns `false`
    /// and records nothing when the device lacks line rasterization.
    ///
    /// [`Material::wireframe_override`]: crate::params::Material::wireframe_override
    pub fn draw_mesh_wireframe(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        mesh: &GpuMesh,
        globals: &UniformBinding,
        object: &UniformBinding,
        material: &wgpu::BindGroup,
    ) -> bool {
        match &self.lighting_lines {
            Some(pipeline) => {
                self.record_mesh(pipeline, pass, mesh, globals, object, material);
                true
            }
            None => false,
        }
    }

    fn record_mesh(
        &self,
        pipeline: &wgpu::RenderPipeline,
        pass: &mut wgpu::RenderPass<'_>,
        mesh: &GpuMesh,
        globals: &UniformBinding,
        object: &UniformBinding,
        material: &wgpu::BindGroup,
    ) {
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &globals.bind_group, &[]);
        pass.set_bind_group(1, &object.bind_group, &[]);
        pass.set_bind_group(2, material, &[]);
        pass.set_vertex_buffer(0, mesh.vertex.slice(..));
        pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }

    /// Records the grid draw; record it after the meshes it may be hidden by.
    pub fn draw_grid(&self, pass: &mut wgpu::RenderPass<'_>, grid: &UniformBinding) {
        pass.set_pipeline(&self.grid);
        pass.set_bind_group(0, &grid.bind_group, &[]);
        pass.draw(0..6, 0..1);
    }
}

use glam::{Mat4, Vec3};
use gridlight::grid::GridCamera;
use gridlight::render::{
    request_headless_device, DepthBuffer, GpuMesh, GpuPipelines, GpuTexture, GridUniform,
    LightingGlobals, ObjectUniform,
};
use gridlight::{
    CpuRenderer, DepthConvention, Framebuffer, GridParams, LightRig, Material, Mesh,
    SharedTextures, SpecularModel, Texture2D, TextureHandle, Transforms, CLEAR_COLOR,
};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn create_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
    match pollster::block_on(request_headless_device()) {
        Ok(pair) => Some(pair),
        Err(err) => {
            eprintln!("Skipping GPU test: {err:#}");
            None
        }
    }
}

#[test]
fn lit_mesh_and_grid_record_and_submit() {
    let Some((device, queue)) = create_device_queue() else {
        return;
    };
    let pipelines = GpuPipelines::new(&device, &queue, COLOR_FORMAT);

    let (width, height) = (64, 64);
    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("color-target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth = DepthBuffer::create(&device, width, height);

    let eye = Vec3::new(0.0, 2.0, 5.0);
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.01, 200.0);
    let transforms = Transforms::new(Mat4::IDENTITY, view, projection).with_normal_matrix();

    let mut material = Material::flat(Vec3::new(0.8, 0.3, 0.2));
    material.use_textures = true;
    material.textures.diffuse = Some(TextureHandle(0));
    let diffuse = GpuTexture::from_texture(
        &device,
        &queue,
        &Texture2D::solid(glam::Vec4::new(1.0, 0.5, 0.5, 1.0)),
        "diffuse",
    );

    let globals = pipelines.globals_binding(
        &device,
        &LightingGlobals::new(view, projection, eye, &LightRig::default(), SpecularModel::BlinnPhong),
    );
    let object = pipelines.object_binding(&device, &ObjectUniform::new(&transforms, &material));
    let maps = pipelines.material_bind_group(&device, [Some(&diffuse), None, None, None, None]);
    let grid_params = GridParams {
        depth: gridlight::DepthConvention::WGPU,
        ..GridParams::default()
    };
    let grid = pipelines.grid_binding(
        &device,
        &GridUniform::new(&GridCamera::new(view, projection), &grid_params),
    );
    let mesh = GpuMesh::from_mesh(&device, &Mesh::cube(), "cube");

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("test-encoder"),
    });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.1,
                        g: 0.1,
                        b: 0.1,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pipelines.draw_mesh(&mut pass, &mesh, &globals, &object, &maps);
        pipelines.draw_grid(&mut pass, &grid);
    }
    queue.submit(Some(encoder.finish()));
}

#[test]
fn uniforms_can_be_rewritten_between_frames() {
    let Some((device, queue)) = create_device_queue() else {
        return;
    };
    let pipelines = GpuPipelines::new(&device, &queue, COLOR_FORMAT);
    let globals = LightingGlobals::new(
        Mat4::IDENTITY,
        Mat4::IDENTITY,
        Vec3::ZERO,
        &LightRig::dark(),
        SpecularModel::Phong,
    );
    let binding = pipelines.globals_binding(&device, &globals);
    let brighter = LightingGlobals::new(
        Mat4::IDENTITY,
        Mat4::IDENTITY,
        Vec3::ZERO,
        &LightRig::default(),
        SpecularModel::Phong,
    );
    binding.update(&queue, &brighter);
    queue.submit(std::iter::empty());
}

fn clear_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    color_view: &'a wgpu::TextureView,
    depth: &'a DepthBuffer,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("readback-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color_view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: CLEAR_COLOR.x as f64,
                    g: CLEAR_COLOR.y as f64,
                    b: CLEAR_COLOR.z as f64,
                    a: CLEAR_COLOR.w as f64,
                }),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &depth.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Copies row `y` of `texture` out and returns the RGBA8 texel at `x`.
fn read_texel(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    x: u32,
    y: u32,
) -> [u8; 4] {
    let width = texture.width();
    let bytes_per_row = (width * 4).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback-staging"),
        size: bytes_per_row as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback-encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: 0, y, z: 0 },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(1),
            },
        },
        wgpu::Extent3d {
            width,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .expect("device poll");
    receiver
        .recv()
        .expect("map callback ran")
        .expect("staging buffer mapped");

    let data = slice.get_mapped_range();
    let offset = x as usize * 4;
    [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]
}

#[test]
fn gpu_and_cpu_agree_on_the_lit_cube_center() {
    let Some((device, queue)) = create_device_queue() else {
        return;
    };
    let pipelines = GpuPipelines::new(&device, &queue, COLOR_FORMAT);

    let (width, height) = (64, 64);
    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("readback-target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth = DepthBuffer::create(&device, width, height);

    let eye = Vec3::new(0.0, 2.0, 5.0);
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.01, 200.0);
    let transforms = Transforms::new(Mat4::IDENTITY, view, projection).with_normal_matrix();
    let material = Material::flat(Vec3::new(0.8, 0.3, 0.2));
    let rig = LightRig::default();

    let globals = pipelines.globals_binding(
        &device,
        &LightingGlobals::new(view, projection, eye, &rig, SpecularModel::BlinnPhong),
    );
    let object = pipelines.object_binding(&device, &ObjectUniform::new(&transforms, &material));
    let maps = pipelines.material_bind_group(&device, [None, None, None, None, None]);
    let mesh = GpuMesh::from_mesh(&device, &Mesh::cube(), "cube");

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("test-encoder"),
    });
    {
        let mut pass = clear_pass(&mut encoder, &color_view, &depth);
        pipelines.draw_mesh(&mut pass, &mesh, &globals, &object, &maps);
    }
    queue.submit(Some(encoder.finish()));
    let gpu = read_texel(&device, &queue, &color, width / 2, height / 2);

    let renderer = CpuRenderer::new(
        DepthConvention::WGPU,
        SpecularModel::BlinnPhong,
        SharedTextures::default(),
    );
    let mut target = Framebuffer::new(width, height).expect("framebuffer");
    target.clear(CLEAR_COLOR, 1.0);
    renderer
        .draw_mesh(&mut target, &Mesh::cube(), &transforms, &material, &rig, eye)
        .expect("cpu draw");
    let cpu = target.to_rgba8().get_pixel(width / 2, height / 2).0;

    // the center ray lands on the front face, away from any edge
    assert_ne!(cpu, target.to_rgba8().get_pixel(0, 0).0);
    for channel in 0..3 {
        let diff = (gpu[channel] as i32 - cpu[channel] as i32).abs();
        assert!(diff <= 3, "gpu {gpu:?} vs cpu {cpu:?}");
    }
}

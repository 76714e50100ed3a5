use super::texture::YuvTexture;
use iced_wgpu::primitive::Primitive;
use iced_wgpu::wgpu;
use std::sync::{Arc, Mutex};

/// Uniform block of the shader, padded to 16 bytes.
#[repr(C)]
#[derive(Clone, Copy)]
struct Uniforms {
    srgb_target: u32,
    _padding: [u32; 3],
}

impl Uniforms {
    fn as_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&self.srgb_target.to_ne_bytes());
        bytes
    }
}

/// GPU copy of the window texture: one R8 texture per plane.
struct PlaneTextures {
    y: wgpu::Texture,
    u: wgpu::Texture,
    v: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

pub struct VideoPipeline {
    pipeline: wgpu::RenderPipeline,
    bg0_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: wgpu::Buffer,
    planes: Option<PlaneTextures>,
    uploaded_generation: Option<u64>,
}

impl VideoPipeline {
    fn plane_texture(device: &wgpu::Device, label: &str, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    }

    fn create_planes(&self, device: &wgpu::Device, width: u32, height: u32) -> PlaneTextures {
        let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));
        let y = Self::plane_texture(device, "fpd Y texture", width, height);
        let u = Self::plane_texture(device, "fpd U texture", cw, ch);
        let v = Self::plane_texture(device, "fpd V texture", cw, ch);

        let y_view = y.create_view(&wgpu::TextureViewDescriptor::default());
        let u_view = u.create_view(&wgpu::TextureViewDescriptor::default());
        let v_view = v.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fpd video bind group"),
            layout: &self.bg0_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&y_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&u_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&v_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.uniforms,
                        offset: 0,
                        size: None,
                    }),
                },
            ],
        });

        PlaneTextures { y, u, v, bind_group }
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, texture: &YuvTexture) {
        let width = texture.width() as u32;
        let height = texture.height() as u32;
        if width == 0 || height == 0 {
            return;
        }

        let needs_recreate = match &self.planes {
            None => true,
            Some(planes) => {
                let size = planes.y.size();
                size.width != width || size.height != height
            }
        };
        if needs_recreate {
            log::info!("VideoPipeline: creating textures {}x{}", width, height);
            self.planes = Some(self.create_planes(device, width, height));
        }

        let Some(planes) = &self.planes else {
            return;
        };
        let (y, u, v) = texture.planes();
        let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));

        write_plane(queue, &planes.y, y, width, height);
        write_plane(queue, &planes.u, u, cw, ch);
        write_plane(queue, &planes.v, v, cw, ch);

        self.uploaded_generation = Some(texture.generation());
    }

    fn draw(
        &self,
        target: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        viewport: &iced::Rectangle<u32>,
    ) {
        let Some(planes) = &self.planes else {
            return;
        };
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fpd video render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &planes.bind_group, &[]);
        pass.set_viewport(
            viewport.x as _,
            viewport.y as _,
            viewport.width as _,
            viewport.height as _,
            0.0,
            1.0,
        );
        pass.draw(0..4, 0..1);
    }
}

fn write_plane(queue: &wgpu::Queue, texture: &wgpu::Texture, data: &[u8], width: u32, height: u32) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

fn plane_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

impl iced_wgpu::primitive::Pipeline for VideoPipeline {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fpd video shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bg0_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fpd video bind group 0 layout"),
            entries: &[
                plane_layout_entry(0),
                plane_layout_entry(1),
                plane_layout_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fpd video pipeline layout"),
            bind_group_layouts: &[&bg0_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fpd video pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("fpd video sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fpd video uniforms"),
            size: size_of::<Uniforms>() as _,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
            mapped_at_creation: false,
        });
        let values = Uniforms {
            srgb_target: format.is_srgb() as u32,
            _padding: [0; 3],
        };
        queue.write_buffer(&uniforms, 0, &values.as_bytes());

        VideoPipeline {
            pipeline,
            bg0_layout,
            sampler,
            uniforms,
            planes: None,
            uploaded_generation: None,
        }
    }
}

/// Draws the window texture into the primitive's bounds.
#[derive(Debug, Clone)]
pub struct VideoPrimitive {
    texture: Arc<Mutex<YuvTexture>>,
}

impl VideoPrimitive {
    pub fn new(texture: Arc<Mutex<YuvTexture>>) -> Self {
        VideoPrimitive { texture }
    }
}

impl Primitive for VideoPrimitive {
    type Pipeline = VideoPipeline;

    fn prepare(
        &self,
        pipeline: &mut VideoPipeline,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        _bounds: &iced::Rectangle,
        _viewport: &iced_wgpu::graphics::Viewport,
    ) {
        // Never block the render thread; a contended lock retries next frame
        // because the generation is still unseen.
        if let Ok(texture) = self.texture.try_lock()
            && pipeline.uploaded_generation != Some(texture.generation())
        {
            pipeline.upload(device, queue, &texture);
        }
    }

    fn render(
        &self,
        pipeline: &VideoPipeline,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clip_bounds: &iced::Rectangle<u32>,
    ) {
        pipeline.draw(target, encoder, clip_bounds);
    }
}

//! GPU thermal erosion using wgpu compute shaders.
//!
//! Mirrors the CPU pass with two pipelines per iteration: "flow" reads the
//! current heights and writes per-cell outflow to a 4-channel buffer, then
//! "apply" combines heights, own outflow and neighbor inflow into the other
//! height buffer. The two height buffers ping-pong; the result is read back
//! through a staging buffer with a blocking map.

use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;
use wgpu::util::DeviceExt;

use crate::erosion::{ErosionEngine, ThermalParams};
use crate::tilemap::Tilemap;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuThermalParams {
    width: u32,
    height: u32,
    talus: f32,
    carry: f32,
}

/// GPU context for thermal erosion. Pipelines live for the context's
/// lifetime; data buffers are created per call and dropped before return.
pub struct GpuThermalErosion {
    device: wgpu::Device,
    queue: wgpu::Queue,
    flow_pipeline: wgpu::ComputePipeline,
    apply_pipeline: wgpu::ComputePipeline,
    flow_layout: wgpu::BindGroupLayout,
    apply_layout: wgpu::BindGroupLayout,
}

impl GpuThermalErosion {
    /// Create the context. Returns None when no adapter or device with
    /// compute support is available.
    pub fn new() -> Option<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Option<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        println!("GPU Adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Thermal Erosion GPU"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .ok()?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Thermal Erosion Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(THERMAL_SHADER)),
        });

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let uniform = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        // Flow pass: height in, flow out.
        let flow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Thermal Flow Layout"),
            entries: &[storage(0, true), storage(1, false), uniform(2)],
        });
        // Apply pass: height in, flow in, height out.
        let apply_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Thermal Apply Layout"),
            entries: &[storage(0, true), storage(1, true), storage(2, false), uniform(3)],
        });

        let flow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Thermal Flow Pipeline Layout"),
                bind_group_layouts: &[&flow_layout],
                push_constant_ranges: &[],
            });
        let apply_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Thermal Apply Pipeline Layout"),
                bind_group_layouts: &[&apply_layout],
                push_constant_ranges: &[],
            });

        let flow_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Thermal Flow Pipeline"),
            layout: Some(&flow_pipeline_layout),
            module: &shader,
            entry_point: Some("flow_main"),
            compilation_options: Default::default(),
            cache: None,
        });
        let apply_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Thermal Apply Pipeline"),
            layout: Some(&apply_pipeline_layout),
            module: &shader,
            entry_point: Some("apply_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Some(Self {
            device,
            queue,
            flow_pipeline,
            apply_pipeline,
            flow_layout,
            apply_layout,
        })
    }

    fn run(&self, height: &mut Tilemap<f32>, params: &ThermalParams) -> bool {
        let w = height.width;
        let h = height.height;
        let n = w * h;
        if n == 0 {
            return false;
        }
        let byte_size = (n * std::mem::size_of::<f32>()) as u64;

        let height_a = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Height A"),
            contents: bytemuck::cast_slice(height.as_slice()),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });
        let height_b = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Height B"),
            contents: bytemuck::cast_slice(height.as_slice()),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });
        let flow = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Flow Buffer"),
            size: byte_size * 4,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let gpu_params = GpuThermalParams {
            width: w as u32,
            height: h as u32,
            talus: params.talus,
            carry: params.carry,
        };
        let params_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Thermal Params"),
            contents: bytemuck::bytes_of(&gpu_params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        // Two bind groups per pass, selected by iteration parity for the
        // A/B ping-pong.
        let flow_group = |src: &wgpu::Buffer| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Thermal Flow Bind Group"),
                layout: &self.flow_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: src.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: flow.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let apply_group = |src: &wgpu::Buffer, dst: &wgpu::Buffer| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Thermal Apply Bind Group"),
                layout: &self.apply_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: src.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: flow.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: dst.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            })
        };

        let flow_from_a = flow_group(&height_a);
        let flow_from_b = flow_group(&height_b);
        let apply_a_to_b = apply_group(&height_a, &height_b);
        let apply_b_to_a = apply_group(&height_b, &height_a);

        let groups_x = (w as u32).div_ceil(16);
        let groups_y = (h as u32).div_ceil(16);

        for it in 0..params.iterations {
            let even = it % 2 == 0;
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Thermal Encoder"),
                });

            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Thermal Flow Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.flow_pipeline);
                pass.set_bind_group(0, if even { &flow_from_a } else { &flow_from_b }, &[]);
                pass.dispatch_workgroups(groups_x, groups_y, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Thermal Apply Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.apply_pipeline);
                pass.set_bind_group(0, if even { &apply_a_to_b } else { &apply_b_to_a }, &[]);
                pass.dispatch_workgroups(groups_x, groups_y, 1);
            }

            self.queue.submit(std::iter::once(encoder.finish()));
        }

        // The final heights sit in A after an even iteration count, B after
        // an odd one.
        let result_buffer = if params.iterations % 2 == 0 {
            &height_a
        } else {
            &height_b
        };

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Thermal Staging"),
            size: byte_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Thermal Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(result_buffer, 0, &staging, 0, byte_size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        match receiver.recv() {
            Ok(Ok(())) => {}
            _ => return false,
        }

        let data = slice.get_mapped_range();
        height.as_mut_slice().copy_from_slice(bytemuck::cast_slice(&data));
        drop(data);
        staging.unmap();

        true
    }
}

impl ErosionEngine for GpuThermalErosion {
    fn thermal_erode(&mut self, height: &mut Tilemap<f32>, params: &ThermalParams) -> bool {
        self.run(height, params)
    }
}

/// WGSL compute shader: flow pass writes per-cell outflow to the four
/// cardinal neighbors (channel order +x, -x, -y, +y), apply pass folds own
/// outflow and neighbor inflow into the destination height buffer.
const THERMAL_SHADER: &str = r#"
struct Params {
    width: u32,
    height: u32,
    talus: f32,
    carry: f32,
}

@group(0) @binding(0) var<storage, read> height_in: array<f32>;
@group(0) @binding(1) var<storage, read_write> flow: array<vec4<f32>>;
@group(0) @binding(2) var<uniform> flow_params: Params;

fn sample_or_center(x: i32, y: i32, center: f32, p: Params) -> f32 {
    if (x < 0 || y < 0 || x >= i32(p.width) || y >= i32(p.height)) {
        return center;
    }
    return height_in[u32(y) * p.width + u32(x)];
}

@compute @workgroup_size(16, 16)
fn flow_main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let p = flow_params;
    if (gid.x >= p.width || gid.y >= p.height) {
        return;
    }
    let x = i32(gid.x);
    let y = i32(gid.y);
    let i = gid.y * p.width + gid.x;
    let hc = height_in[i];

    let h_px = sample_or_center(x + 1, y, hc, p);
    let h_nx = sample_or_center(x - 1, y, hc, p);
    let h_ny = sample_or_center(x, y - 1, hc, p);
    let h_py = sample_or_center(x, y + 1, hc, p);

    var outflow = vec4<f32>(0.0);
    let d_px = (hc - h_px) - p.talus;
    let d_nx = (hc - h_nx) - p.talus;
    let d_ny = (hc - h_ny) - p.talus;
    let d_py = (hc - h_py) - p.talus;
    if (d_px > 0.0) { outflow.x = p.carry * d_px; }
    if (d_nx > 0.0) { outflow.y = p.carry * d_nx; }
    if (d_ny > 0.0) { outflow.z = p.carry * d_ny; }
    if (d_py > 0.0) { outflow.w = p.carry * d_py; }

    flow[i] = outflow;
}

@group(0) @binding(0) var<storage, read> apply_height_in: array<f32>;
@group(0) @binding(1) var<storage, read> apply_flow: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> height_out: array<f32>;
@group(0) @binding(3) var<uniform> apply_params: Params;

@compute @workgroup_size(16, 16)
fn apply_main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let p = apply_params;
    if (gid.x >= p.width || gid.y >= p.height) {
        return;
    }
    let x = gid.x;
    let y = gid.y;
    let i = y * p.width + x;

    let own = apply_flow[i];
    var h = apply_height_in[i] - (own.x + own.y + own.z + own.w);

    // Inflow: the -x neighbor's +x channel and so on.
    if (x > 0u) {
        h = h + apply_flow[i - 1u].x;
    }
    if (x + 1u < p.width) {
        h = h + apply_flow[i + 1u].y;
    }
    if (y > 0u) {
        h = h + apply_flow[i - p.width].w;
    }
    if (y + 1u < p.height) {
        h = h + apply_flow[i + p.width].z;
    }

    height_out[i] = h;
}
"#;

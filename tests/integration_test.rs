use proptest::prelude::{any as arbitrary, prop_assert_eq, proptest};
use static_assertions::assert_eq_size;
use std::sync::Arc;
use workgrid::prelude::*;

fn platform(threads: usize) -> Platform {
    let options = PlatformOptions::builder(Arc::new(SystemMemoryResource::new()))
        .cpu_num_of_threads(threads)
        .cpu_task_batch_size(4)
        .enable_debug_mode(true)
        .build()
        .unwrap();
    let mut platform = Platform::new();
    platform.initialize(&options).unwrap();
    platform
}

fn device(platform: &Platform, subgroup_size: u32) -> Device {
    platform
        .make_device(0, &DeviceOptions::new().cpu_subgroup_size(subgroup_size))
        .unwrap()
}

fn buffer<T: bytemuck::Pod>(device: &Device, len: usize) -> Buffer<T> {
    let mut buffer = make_storage_buffer::<T>(device, BufferUsage::HostOnly).unwrap();
    buffer.set_size(len).unwrap();
    buffer
}

#[test]
fn test_platform_lifecycle() {
    let mut platform = platform(2);
    assert!(platform.has_sub_platform(SubPlatformType::Cpu));
    assert!(!platform.has_sub_platform(SubPlatformType::Vulkan));

    platform.destroy();
    assert!(!platform.has_sub_platform(SubPlatformType::Cpu));
    assert!(!platform.has_sub_platform(SubPlatformType::Vulkan));

    let options = PlatformOptions::new(Arc::new(SystemMemoryResource::new()));
    platform.initialize(&options).unwrap();
    assert!(platform.has_sub_platform(SubPlatformType::Cpu));
    assert_eq!(platform.device_info_list().unwrap().len(), 1);
}

struct FenceArgs<'a> {
    table: GlobalPtr<'a, u32>,
    results: GlobalPtr<'a, u32>,
}

#[test]
fn test_local_memory_fence() {
    const RESOLUTION: u32 = 1024;

    let platform = platform(4);
    let device = device(&platform, 4);
    let table = buffer::<u32>(&device, RESOLUTION as usize);
    let results = buffer::<u32>(&device, RESOLUTION as usize);

    let mut builder = make_kernel::<1, FenceArgs>(&device).unwrap();
    let scratch = builder.local::<u32>(4);
    let kernel = builder
        .name("local_fence")
        .phase(move |item, args, local, _| {
            let lid = item.get_local_id(0);
            let value = (lid % item.get_local_size(0)) as u32 + 1;
            local.get(scratch).write(lid, value);
            args.table.write(item.get_global_id(0), value);
        })
        .barrier(CLK_LOCAL_MEM_FENCE)
        .phase(move |item, args, local, _| {
            let scratch = local.get(scratch);
            let sum = (0..scratch.len()).map(|i| scratch.read(i)).sum::<u32>();
            args.results.write(item.get_global_id(0), sum);
        })
        .build()
        .unwrap();
    assert_eq!(kernel.num_of_phases(), 2);

    let args = FenceArgs {
        table: table.global(),
        results: results.global(),
    };
    kernel.run(&args, [RESOLUTION], 0).unwrap();
    device.wait_for_completion();

    for (i, value) in table.to_vec().into_iter().enumerate() {
        assert_eq!(value, (i % 4) as u32 + 1);
    }
    assert!(results.to_vec().iter().all(|&sum| sum == 10));
}

struct CounterArgs<'a> {
    counter: GlobalPtr<'a, i32>,
    flags: GlobalPtr<'a, u32>,
}

#[test]
fn test_atomic_add_sub_convergence() {
    const RESOLUTION: u32 = 10_000;

    let platform = platform(4);
    let device = device(&platform, 16);
    let counter = buffer::<i32>(&device, 1);
    let flags = buffer::<u32>(&device, RESOLUTION as usize);

    let add = make_kernel::<1, CounterArgs>(&device)
        .unwrap()
        .phase(|item, args, _, _| {
            let i = item.get_global_id(0);
            if i < args.flags.len() {
                atomic_add(args.counter, 1);
                args.flags.write(i, 1);
            }
        })
        .build()
        .unwrap();
    let sub = make_kernel::<1, CounterArgs>(&device)
        .unwrap()
        .phase(|item, args, _, _| {
            let i = item.get_global_id(0);
            if i < args.flags.len() {
                atomic_sub(args.counter, 1);
                args.flags.write(i, 2);
            }
        })
        .build()
        .unwrap();

    let args = CounterArgs {
        counter: counter.global(),
        flags: flags.global(),
    };

    add.run(&args, [RESOLUTION], 0).unwrap();
    assert_eq!(counter.to_vec(), vec![10_000]);
    assert!(flags.to_vec().iter().all(|&f| f == 1));

    counter.write(&[0], 0).unwrap();
    sub.run(&args, [RESOLUTION], 0).unwrap();
    assert_eq!(counter.to_vec(), vec![-10_000]);
    assert!(flags.to_vec().iter().all(|&f| f == 2));
}

struct MinMaxArgs<'a> {
    min: GlobalPtr<'a, i32>,
    max: GlobalPtr<'a, i32>,
    resolution: usize,
}

#[test]
fn test_atomic_min_max_convergence() {
    let platform = platform(3);
    let device = device(&platform, 8);
    let min = buffer::<i32>(&device, 1);
    let max = buffer::<i32>(&device, 1);
    min.write(&[i32::MAX], 0).unwrap();
    max.write(&[-1], 0).unwrap();

    let kernel = make_kernel::<1, MinMaxArgs>(&device)
        .unwrap()
        .phase(|item, args, _, _| {
            let i = item.get_global_id(0);
            if i < args.resolution {
                atomic_min(args.min, i as i32);
                atomic_max(args.max, i as i32);
            }
        })
        .build()
        .unwrap();

    let resolution = 5000;
    let args = MinMaxArgs {
        min: min.global(),
        max: max.global(),
        resolution,
    };
    kernel.run(&args, [resolution as u32], 0).unwrap();

    assert_eq!(min.to_vec(), vec![0]);
    assert_eq!(max.to_vec(), vec![resolution as i32 - 1]);
}

struct GroupCountArgs<'a> {
    counts: GlobalPtr<'a, u32>,
}

#[test]
fn test_local_atomics_count_group() {
    const RESOLUTION: u32 = 512;
    const INCREMENT: u32 = 2;

    let platform = platform(4);
    let device = device(&platform, 8);
    let counts = buffer::<u32>(&device, RESOLUTION as usize);

    let mut builder = make_kernel::<1, GroupCountArgs>(&device).unwrap();
    let counter = builder.local::<u32>(1);
    let kernel = builder
        .phase(move |_, _, local, _| {
            atomic_add(local.get(counter), INCREMENT);
        })
        .barrier(CLK_LOCAL_MEM_FENCE)
        .phase(move |item, args, local, _| {
            args.counts
                .write(item.get_global_id(0), local.get(counter).read(0));
        })
        .build()
        .unwrap();

    // run twice: the counter must start from zero in every group
    for _ in 0..2 {
        kernel
            .run(&GroupCountArgs { counts: counts.global() }, [RESOLUTION], 0)
            .unwrap();
        assert!(counts.to_vec().iter().all(|&c| c == 8 * INCREMENT));
    }
}

struct IdArgs<'a> {
    hits: GlobalPtr<'a, u32>,
    errors: GlobalPtr<'a, u32>,
    works: [usize; 3],
}

fn check_ids<const D: usize>(device: &Device, works: [u32; D]) {
    let mut padded = [1usize; 3];
    for (p, &w) in padded.iter_mut().zip(works.iter()) {
        *p = w as usize;
    }
    let total: usize = padded.iter().product();
    let hits = buffer::<u32>(device, total);
    let errors = buffer::<u32>(device, 1);

    let kernel = make_kernel::<D, IdArgs>(device)
        .unwrap()
        .phase(|item, args, _, _| {
            let mut inside = true;
            let mut index = 0;
            for dim in (0..3u32).rev() {
                let global = item.get_global_id(dim);
                let expected =
                    item.get_group_id(dim) * item.get_local_size(dim) + item.get_local_id(dim);
                if global != expected || item.get_local_id(dim) >= item.get_local_size(dim) {
                    atomic_inc(args.errors);
                }
                inside &= global < args.works[dim as usize];
                index = index * args.works[dim as usize] + global;
            }
            if item.get_work_dim() != D as u32 {
                atomic_inc(args.errors);
            }
            if inside {
                atomic_inc(args.hits.offset(index));
            }
        })
        .build()
        .unwrap();

    let args = IdArgs {
        hits: hits.global(),
        errors: errors.global(),
        works: padded,
    };
    kernel.run(&args, works, 0).unwrap();

    assert_eq!(errors.to_vec(), vec![0]);
    assert!(hits.to_vec().iter().all(|&h| h == 1), "every work-item runs once");
}

#[test]
fn test_work_item_ids() {
    let platform = platform(4);
    let device = device(&platform, 8);
    check_ids(&device, [100]);
    check_ids(&device, [13, 7]);
    check_ids(&device, [5, 6, 7]);
}

#[test]
fn test_work_group_size_products() {
    let platform = platform(1);
    for exp in 0..=10 {
        let size = 1u32 << exp;
        let device = device(&platform, size);
        for dim in 1..=3 {
            assert_eq!(device.work_group_size(dim).iter().product::<u32>(), size);
        }
    }
    assert!(platform
        .make_device(0, &DeviceOptions::new().cpu_subgroup_size(24))
        .is_err());
}

#[test]
fn test_private_state_survives_barrier() {
    struct Args<'a> {
        out: GlobalPtr<'a, u32>,
    }

    let platform = platform(2);
    let device = device(&platform, 4);
    let out = buffer::<u32>(&device, 64);

    let kernel = make_kernel::<1, Args>(&device)
        .unwrap()
        .with_private::<u32>()
        .phase(|item, _, _, private: &mut u32| {
            *private += item.get_global_id(0) as u32;
        })
        .barrier(CLK_GLOBAL_MEM_FENCE)
        .phase(|item, args, _, private: &mut u32| {
            assert_eq!(item.generation(), 1);
            args.out.write(item.get_global_id(0), *private * 2);
        })
        .build()
        .unwrap();

    kernel.run(&Args { out: out.global() }, [64], 0).unwrap();
    for (i, v) in out.to_vec().into_iter().enumerate() {
        assert_eq!(v, i as u32 * 2);
    }
}

#[test]
fn test_geometry_in_kernel() {
    struct Args<'a> {
        points: GlobalPtr<'a, float3>,
        lengths: GlobalPtr<'a, f32>,
        normals: GlobalPtr<'a, float3>,
    }

    const RESOLUTION: usize = 96;
    let platform = platform(3);
    let device = device(&platform, 8);
    let points = buffer::<float3>(&device, RESOLUTION);
    let lengths = buffer::<f32>(&device, RESOLUTION);
    let normals = buffer::<float3>(&device, RESOLUTION);
    let input: Vec<float3> = (0..RESOLUTION)
        .map(|i| float3::new([i as f32, 0.0, -(i as f32)]))
        .collect();
    points.write(&input, 0).unwrap();

    let kernel = make_kernel::<1, Args>(&device)
        .unwrap()
        .phase(|item, args, _, _| {
            let i = item.get_global_id(0);
            let p = args.points.read(i);
            args.lengths.write(i, length(p));
            args.normals.write(i, normalize(p));
        })
        .build()
        .unwrap();

    let args = Args {
        points: points.global(),
        lengths: lengths.global(),
        normals: normals.global(),
    };
    kernel.run(&args, [RESOLUTION as u32], 0).unwrap();

    let lengths = lengths.to_vec();
    let normals = normals.to_vec();
    assert_eq!(lengths[0], 0.0);
    assert_eq!(normals[0].to_array(), [0.0; 3]);
    for i in 1..RESOLUTION {
        let want = i as f32 * M_SQRT2_F;
        assert!((lengths[i] - want).abs() <= 1e-5 * want);
        let [x, y, z] = normals[i].to_array();
        assert!((x - M_SQRT1_2_F).abs() < 1e-6);
        assert_eq!(y, 0.0);
        assert!((z + M_SQRT1_2_F).abs() < 1e-6);
    }
}

#[test]
fn test_uniform_buffer_as_constant() {
    struct Args<'a> {
        scale: ConstantPtr<'a, f32>,
        data: GlobalPtr<'a, f32>,
    }

    let platform = platform(2);
    let device = device(&platform, 4);
    let mut scale = make_uniform_buffer::<f32>(&device, BufferUsage::HostToDevice).unwrap();
    scale.set_size(1).unwrap();
    scale.write(&[0.5], 0).unwrap();
    let data = buffer::<f32>(&device, 32);
    data.write(&(0..32).map(|i| i as f32).collect::<Vec<_>>(), 0)
        .unwrap();

    let kernel = make_kernel::<1, Args>(&device)
        .unwrap()
        .phase(|item, args, _, _| {
            let i = item.get_global_id(0);
            args.data.write(i, args.data.read(i) * args.scale.get());
        })
        .build()
        .unwrap();
    kernel
        .run(
            &Args {
                scale: scale.constant(),
                data: data.global(),
            },
            [32],
            0,
        )
        .unwrap();

    assert_eq!(data.to_vec()[31], 15.5);
}

#[test]
fn test_kernel_panic_is_reported() {
    struct Args<'a> {
        data: GlobalPtr<'a, u32>,
    }

    let platform = platform(2);
    let device = device(&platform, 4);
    let data = buffer::<u32>(&device, 8);

    let kernel = make_kernel::<1, Args>(&device)
        .unwrap()
        .phase(|item, args, _, _| {
            // reads past the end for ids >= 8
            let _ = args.data.read(item.get_global_id(0));
        })
        .build()
        .unwrap();

    let result = kernel.run(&Args { data: data.global() }, [16], 0);
    assert!(matches!(result, Err(Error::WorkerPanic(_))));

    // the pool survives the panic
    assert!(kernel.run(&Args { data: data.global() }, [8], 0).is_ok());
}

#[test]
fn test_vulkan_slot_empty_when_disabled() {
    let platform = platform(1);
    assert!(platform.sub_platform(SubPlatformType::Vulkan).is_err());
}

#[cfg(feature = "telemetry")]
#[test]
fn test_dispatch_metrics() {
    struct Args<'a> {
        data: GlobalPtr<'a, u32>,
    }

    let platform = platform(2);
    let device = device(&platform, 4);
    let data = buffer::<u32>(&device, 64);
    let kernel = make_kernel::<1, Args>(&device)
        .unwrap()
        .phase(|item, args, _, _| args.data.write(item.get_global_id(0), 1))
        .build()
        .unwrap();

    for _ in 0..3 {
        kernel.run(&Args { data: data.global() }, [64], 0).unwrap();
    }

    let snapshot = kernel.device().metrics().snapshot();
    assert_eq!(snapshot.dispatches, 3);
    assert_eq!(snapshot.work_groups, 3 * 16);
    assert_eq!(snapshot.work_items, 3 * 64);
    assert!(snapshot.batches >= 3);
}

// padded lane count times the scalar size
assert_eq_size!(char3, [i8; 4]);
assert_eq_size!(short3, [i16; 4]);
assert_eq_size!(int3, [i32; 4]);
assert_eq_size!(float3, [f32; 4]);
assert_eq_size!(double3, [f64; 4]);
assert_eq_size!(half2, [u16; 2]);
assert_eq_size!(int4, [u32; 4]);
assert_eq_size!(long2, [u64; 2]);

#[test]
fn test_vector_alignment() {
    use std::mem::align_of;
    assert_eq!(align_of::<uchar2>(), 2);
    assert_eq!(align_of::<float3>(), 16);
    assert_eq!(align_of::<double3>(), 32);
    assert_eq!(align_of::<half4>(), 8);
}

#[test]
fn test_vload_vstore_half() {
    let mut storage = [half::f16::ZERO; 8];
    let p = PrivatePtr::from_mut(&mut storage);

    let v = float4::new([1.0, -2.5, 0.125, 65504.0]);
    vstore_half_n(v, 1, p);
    assert_eq!(vload_half_n::<4, _>(1, p), v);

    vstore_half(0.1, 0, p);
    assert!((vload_half(0, p) - 0.1).abs() < 1e-3);
}

#[test]
fn test_vload_vstore_int() {
    let mut storage = [0i64; 12];
    let p = PrivatePtr::from_mut(&mut storage);
    let v = long3::new([7, -8, i64::MAX]);
    vstore(v, 2, p);
    assert_eq!(vload::<i64, 3, _>(2, p), v);
    assert_eq!(p.read(6), 7);
}

proptest! {
    #[test]
    fn prop_isequal_and_select(a in arbitrary::<[i32; 4]>(), b in arbitrary::<[i32; 4]>(), same in arbitrary::<[bool; 4]>()) {
        let mut b = b;
        for i in 0..4 {
            if same[i] {
                b[i] = a[i];
            }
        }
        let (va, vb) = (int4::new(a), int4::new(b));
        let mask = isequal(va, vb);
        for i in 0..4 {
            prop_assert_eq!(mask[i], if a[i] == b[i] { -1 } else { 0 });
        }

        let picked = select(va, vb, mask);
        for i in 0..4 {
            if a[i] == b[i] {
                prop_assert_eq!(picked[i], vb[i]);
            } else {
                prop_assert_eq!(picked[i], va[i]);
            }
        }
    }

    #[test]
    fn prop_float_compare(a in arbitrary::<[f32; 3]>(), b in arbitrary::<[f32; 3]>()) {
        let mask = isless(float3::new(a), float3::new(b));
        for i in 0..3 {
            prop_assert_eq!(mask[i] == -1, a[i] < b[i]);
        }
        prop_assert_eq!(any(mask) == 1, (0..3).any(|i| a[i] < b[i]));
        prop_assert_eq!(all(mask) == 1, (0..3).all(|i| a[i] < b[i]));
    }

    #[test]
    fn prop_vstore_vload_round_trip(lanes in arbitrary::<[u16; 4]>(), offset in 0usize..4) {
        let mut storage = [0u16; 16];
        let p = PrivatePtr::from_mut(&mut storage);
        let v = ushort4::new(lanes);
        vstore(v, offset, p);
        prop_assert_eq!(vload::<u16, 4, _>(offset, p), v);
    }
}

//! Stress tests for the CPU dispatch path

use std::sync::Arc;
use std::thread;
use workgrid::prelude::*;

fn platform(threads: usize, batch: usize) -> Platform {
    let options = PlatformOptions::builder(Arc::new(SystemMemoryResource::new()))
        .cpu_num_of_threads(threads)
        .cpu_task_batch_size(batch)
        .build()
        .unwrap();
    let mut platform = Platform::new();
    platform.initialize(&options).unwrap();
    platform
}

struct Args<'a> {
    counter: GlobalPtr<'a, u64>,
    table: GlobalPtr<'a, u32>,
}

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_many_small_dispatches() {
    let platform = platform(4, 8);
    let device = platform
        .make_device(0, &DeviceOptions::new().cpu_subgroup_size(4))
        .unwrap();
    let mut counter = make_storage_buffer::<u64>(&device, BufferUsage::HostOnly).unwrap();
    counter.set_size(1).unwrap();
    let mut table = make_storage_buffer::<u32>(&device, BufferUsage::HostOnly).unwrap();
    table.set_size(64).unwrap();

    let kernel = make_kernel::<1, Args>(&device)
        .unwrap()
        .phase(|item, args, _, _| {
            atomic_inc(args.counter);
            atomic_inc(args.table.offset(item.get_global_id(0)));
        })
        .build()
        .unwrap();

    let args = Args {
        counter: counter.global(),
        table: table.global(),
    };
    for _ in 0..2000 {
        kernel.run(&args, [64], 0).unwrap();
    }

    assert_eq!(counter.to_vec(), vec![2000 * 64]);
    assert!(table.to_vec().iter().all(|&v| v == 2000));
}

#[test]
#[ignore]
fn stress_test_large_grid_barriers() {
    struct Args<'a> {
        out: GlobalPtr<'a, u32>,
    }

    let platform = platform(8, 32);
    let device = platform
        .make_device(0, &DeviceOptions::new().cpu_subgroup_size(256))
        .unwrap();
    let works = [1024u32, 1024];
    let mut out = make_storage_buffer::<u32>(&device, BufferUsage::DeviceToHost).unwrap();
    out.set_size((works[0] * works[1]) as usize).unwrap();

    let mut builder = make_kernel::<2, Args>(&device).unwrap();
    let partial = builder.local::<u32>(256);
    let kernel = builder
        .phase(move |item, _, local, _| {
            local.get(partial).write(item.get_local_linear_id(), 1);
        })
        .barrier(CLK_LOCAL_MEM_FENCE)
        .phase(move |item, args, local, _| {
            let partial = local.get(partial);
            let sum: u32 = (0..partial.len()).map(|i| partial.read(i)).sum();
            args.out.write(item.get_global_linear_id(), sum);
        })
        .build()
        .unwrap();

    kernel.run(&Args { out: out.global() }, works, 0).unwrap();
    assert!(out.to_vec().iter().all(|&v| v == 256));
}

#[test]
#[ignore]
fn stress_test_concurrent_callers() {
    let platform = platform(4, 16);
    let device = platform.make_device(0, &DeviceOptions::new().cpu_subgroup_size(16)).unwrap();
    let mut counter = make_storage_buffer::<u64>(&device, BufferUsage::HostOnly).unwrap();
    counter.set_size(1).unwrap();
    let mut table = make_storage_buffer::<u32>(&device, BufferUsage::HostOnly).unwrap();
    table.set_size(4096).unwrap();

    let kernel = make_kernel::<1, Args>(&device)
        .unwrap()
        .phase(|item, args, _, _| {
            atomic_inc(args.counter);
            atomic_inc(args.table.offset(item.get_global_id(0)));
        })
        .build()
        .unwrap();
    let args = Args {
        counter: counter.global(),
        table: table.global(),
    };

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..50 {
                    kernel.run(&args, [4096], 0).unwrap();
                }
            });
        }
    });
    device.wait_for_completion();

    assert_eq!(counter.to_vec(), vec![8 * 50 * 4096]);
    assert!(table.to_vec().iter().all(|&v| v == 400));
}

#[test]
#[ignore]
fn stress_test_platform_reinitialize() {
    let mut platform = Platform::new();
    let options = PlatformOptions::builder(Arc::new(SystemMemoryResource::new()))
        .cpu_num_of_threads(2)
        .build()
        .unwrap();

    for _ in 0..100 {
        platform.initialize(&options).unwrap();
        let device = platform.make_device(0, &DeviceOptions::new()).unwrap();
        assert_eq!(device.id().id, 0);
        platform.destroy();
    }
}

mod config;

use rand::prelude::*;
use std::sync::{mpsc, Arc, Barrier};
use std::time::Instant;

use crossbeam_epoch::pin;
use crossbeam_utils::thread::scope;

use config::{setup, Config, Op, Perf, DS};
use nbbst::ebr::{ConcurrentSet, EFRBTree, HJBSTree};

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        #[global_allocator]
        static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;
    }
}

fn main() {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    let (config, output) = setup();
    let perf = match config.ds {
        DS::HJBSTree => bench::<HJBSTree<usize>>(&config),
        DS::EFRBTree => bench::<EFRBTree<usize>>(&config),
    };
    println!("{}", perf);
    if let Err(e) = output.write_record(&config, &perf) {
        eprintln!("failed to write the result: {}", e);
        std::process::exit(1);
    }
}

fn bench<S: ConcurrentSet<usize> + Send + Sync>(config: &Config) -> Perf {
    println!("{}", config);
    let set = &S::new();

    let mut rng = rand::thread_rng();
    let mut prefilled = 0;
    while prefilled < config.prefill {
        if set.add(config.key_dist.sample(&mut rng), &pin()) {
            prefilled += 1;
        }
    }
    println!("prefilled");

    let barrier = &Arc::new(Barrier::new(config.threads));
    let (sender, receiver) = mpsc::channel();

    scope(|s| {
        for _ in 0..config.threads {
            let sender = sender.clone();
            s.spawn(move |_| {
                let mut rng = rand::thread_rng();
                let c = barrier.clone();
                let mut ops: u64 = 0;
                c.wait();
                let start = Instant::now();
                while start.elapsed() < config.duration {
                    let key = config.key_dist.sample(&mut rng);
                    let guard = pin();
                    match Op::OPS[config.op_dist.sample(&mut rng)] {
                        Op::Contains => {
                            let _ = set.contains(&key, &guard);
                        }
                        Op::Add => {
                            let _ = set.add(key, &guard);
                        }
                        Op::Remove => {
                            let _ = set.remove(&key, &guard);
                        }
                    }
                    ops += 1;
                }

                // The receiver outlives every worker.
                let _ = sender.send(ops);
            });
        }
    })
    .expect("a benchmark thread panicked");
    drop(sender);

    let ops: u64 = receiver.iter().sum();
    Perf {
        ops_per_sec: ops / config.interval.max(1),
    }
}

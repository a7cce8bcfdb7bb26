// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion};
use stun_agent::agent::{Agent, AGENT_COLLECT_CAP};
use stun_agent::wire::message::{Message, TransactionId};

fn bench_agent(c: &mut Criterion) {
    let mut group = c.benchmark_group("Agent");

    group.bench_function("Collect/None", |b| {
        let agent = Agent::new(None);
        let deadline = Instant::now() + Duration::from_secs(86_400);
        for _ in 0..AGENT_COLLECT_CAP {
            agent.start(TransactionId::generate(), deadline).unwrap();
        }
        let gc_deadline = deadline - Duration::from_secs(1);
        b.iter(|| agent.collect(gc_deadline).unwrap());
    });

    group.bench_function("Process/Stray", |b| {
        let agent = Agent::new(None);
        let deadline = Instant::now() + Duration::from_secs(86_400);
        for _ in 0..1000 {
            agent.start(TransactionId::generate(), deadline).unwrap();
        }
        let mut msg = Message::new();
        msg.new_transaction_id();
        msg.write_header();
        b.iter(|| agent.process(&msg).unwrap());
    });

    group.finish();
}

criterion_group!(agent, bench_agent);
criterion_main!(agent);

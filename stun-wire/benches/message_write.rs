// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use stun_wire::attribute::{Fingerprint, MessageIntegrity, Software, XorMappedAddress};
use stun_wire::message::{Message, MessageClass, MessageType, TransactionId, BINDING};
use stun_wire::prelude::*;

fn bench_message_write(c: &mut Criterion) {
    let mtype = MessageType::from_class_method(MessageClass::Request, BINDING);
    let transaction_id = TransactionId::generate();
    let software = Software::new("stun-wire").unwrap();
    let xor_mapped_address = XorMappedAddress::new("192.168.10.200:9876".parse().unwrap());
    let integrity = MessageIntegrity::new_short_term("password");

    let mut group = c.benchmark_group("Message/Write");
    let mut msg = Message::with_capacity(128);

    group.bench_function(BenchmarkId::from_parameter("Software"), |b| {
        b.iter(|| {
            msg.reset();
            msg.set_type(mtype);
            msg.set_transaction_id(transaction_id);
            msg.write_header();
            software.add_to(&mut msg).unwrap();
        })
    });

    group.bench_function(BenchmarkId::from_parameter("XorMappedAddress"), |b| {
        b.iter(|| {
            msg.reset();
            msg.set_type(mtype);
            msg.set_transaction_id(transaction_id);
            msg.write_header();
            xor_mapped_address.add_to(&mut msg).unwrap();
        })
    });

    group.bench_function(BenchmarkId::from_parameter("Integrity+Fingerprint"), |b| {
        b.iter(|| {
            msg.reset();
            msg.set_type(mtype);
            msg.set_transaction_id(transaction_id);
            msg.write_header();
            software.add_to(&mut msg).unwrap();
            integrity.add_to(&mut msg).unwrap();
            Fingerprint.add_to(&mut msg).unwrap();
        })
    });
    group.finish();

    let mut signed = Message::new();
    signed
        .build(&[&mtype, &transaction_id, &software, &integrity, &Fingerprint])
        .unwrap();
    let data = signed.raw().to_vec();

    let mut group = c.benchmark_group("Message/Read");
    group.throughput(criterion::Throughput::Bytes(data.len() as u64));
    let mut decoded = Message::with_capacity(data.len());
    group.bench_function(BenchmarkId::from_parameter("Decode"), |b| {
        b.iter(|| {
            decoded.reset();
            decoded.raw_mut().extend_from_slice(&data);
            decoded.decode().unwrap();
        })
    });
    group.bench_function(BenchmarkId::from_parameter("DecodeAndVerify"), |b| {
        b.iter(|| {
            decoded.reset();
            decoded.raw_mut().extend_from_slice(&data);
            decoded.decode().unwrap();
            decoded.check(&[&integrity, &Fingerprint]).unwrap();
        })
    });
    group.finish();
}

criterion_group!(message_write, bench_message_write);
criterion_main!(message_write);

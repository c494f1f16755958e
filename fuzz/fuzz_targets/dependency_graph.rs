#![no_main]

use ferrous_lifecycle::{AnyArc, Container, ErasedFactory, Lifetime, ResolutionError, ServiceType};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

struct Node<const N: usize>;

const NODES: usize = 6;

fn node(index: usize) -> (ServiceType, fn() -> AnyArc) {
    fn make<const N: usize>() -> AnyArc {
        Arc::new(Arc::new(Node::<N>))
    }

    match index % NODES {
        0 => (ServiceType::of::<Node<0>>(), make::<0>),
        1 => (ServiceType::of::<Node<1>>(), make::<1>),
        2 => (ServiceType::of::<Node<2>>(), make::<2>),
        3 => (ServiceType::of::<Node<3>>(), make::<3>),
        4 => (ServiceType::of::<Node<4>>(), make::<4>),
        _ => (ServiceType::of::<Node<5>>(), make::<5>),
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < NODES * 2 {
        return;
    }

    // Byte pairs per node: a registration/lifetime byte and an edge bitmask
    let container = Container::new();
    for index in 0..NODES {
        let shape = data[index * 2];
        let edges = data[index * 2 + 1];
        if shape & 0b1000_0000 != 0 {
            continue;
        }

        let lifetime = match shape % 3 {
            0 => Lifetime::Transient,
            1 => Lifetime::Singleton,
            _ => Lifetime::Scoped,
        };
        let (service_type, make) = node(index);
        let parameters: Vec<ServiceType> = (0..NODES)
            .filter(|bit| edges & (1 << bit) != 0)
            .map(|bit| node(bit).0)
            .collect();

        let factory = ErasedFactory::new(service_type, parameters, move |_: &[AnyArc]| Ok(make()));
        container
            .register_erased(service_type, service_type.name(), lifetime, factory)
            .unwrap();
    }

    let ctx = container.new_context();
    for index in 0..NODES {
        let key = node(index).0.name();
        match container.resolve_any(key, Some(&ctx)) {
            Ok(_)
            | Err(ResolutionError::NotRegistered { .. })
            | Err(ResolutionError::DependencyNotRegistered { .. })
            | Err(ResolutionError::CircularDependency { .. }) => {}
            Err(other) => panic!("unexpected resolution error: {other}"),
        }
    }

    let _ = container.validate();
    assert!(container.shutdown(None).is_empty());
});

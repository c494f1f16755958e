use ferrous_lifecycle::{key_of, Container, Lifetime, ResolutionError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct A(#[allow(dead_code)] Arc<B>);
#[derive(Debug)]
struct B(#[allow(dead_code)] Arc<A>);

#[derive(Debug)]
struct X(#[allow(dead_code)] Arc<Y>);
#[derive(Debug)]
struct Y(#[allow(dead_code)] Arc<Z>);
#[derive(Debug)]
struct Z(#[allow(dead_code)] Arc<X>);

#[derive(Debug)]
struct SelfRef(#[allow(dead_code)] Arc<SelfRef>);

#[derive(Debug)]
struct Top(#[allow(dead_code)] Arc<X>);

#[test]
fn test_mutual_dependency_fails_without_invoking_factories() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (ca, cb) = (calls.clone(), calls.clone());

    let container = Container::new();
    container
        .register::<A, _, _>(Lifetime::Singleton, move |b: Arc<B>| {
            ca.fetch_add(1, Ordering::SeqCst);
            A(b)
        })
        .unwrap();
    container
        .register::<B, _, _>(Lifetime::Singleton, move |a: Arc<A>| {
            cb.fetch_add(1, Ordering::SeqCst);
            B(a)
        })
        .unwrap();

    let err = container.resolve::<A>(None).unwrap_err();

    match err {
        ResolutionError::CircularDependency { service, path } => {
            assert_eq!(service, key_of::<A>());
            assert_eq!(path, vec![key_of::<A>(), key_of::<B>(), key_of::<A>()]);
        }
        other => panic!("Expected circular dependency, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_three_way_cycle_reports_full_path() {
    let container = Container::new();
    container.register::<X, _, _>(Lifetime::Transient, X).unwrap();
    container.register::<Y, _, _>(Lifetime::Transient, Y).unwrap();
    container.register::<Z, _, _>(Lifetime::Transient, Z).unwrap();

    let err = container.resolve::<Y>(None).unwrap_err();
    let message = err.to_string();

    assert!(message.starts_with("Circular dependency detected for"));
    match err {
        ResolutionError::CircularDependency { path, .. } => {
            assert_eq!(path, vec![key_of::<Y>(), key_of::<Z>(), key_of::<X>(), key_of::<Y>()]);
        }
        other => panic!("Expected circular dependency, got {:?}", other),
    }
}

#[test]
fn test_self_dependency() {
    let container = Container::new();
    container.register::<SelfRef, _, _>(Lifetime::Scoped, SelfRef).unwrap();

    let err = container.resolve::<SelfRef>(None).unwrap_err();
    assert!(matches!(err, ResolutionError::CircularDependency { ref path, .. } if path.len() == 2));
}

#[test]
fn test_cycle_below_the_root_names_the_cycle_only() {
    let container = Container::new();
    container.register::<Top, _, _>(Lifetime::Transient, Top).unwrap();
    container.register::<X, _, _>(Lifetime::Transient, X).unwrap();
    container.register::<Y, _, _>(Lifetime::Transient, Y).unwrap();
    container.register::<Z, _, _>(Lifetime::Transient, Z).unwrap();

    match container.resolve::<Top>(None).unwrap_err() {
        ResolutionError::CircularDependency { service, path } => {
            assert_eq!(service, key_of::<X>());
            assert_eq!(path.first(), Some(&key_of::<X>()));
            assert!(!path.contains(&key_of::<Top>()));
        }
        other => panic!("Expected circular dependency, got {:?}", other),
    }
}

#[test]
fn test_cycles_pass_validation_but_fail_resolution() {
    let container = Container::new();
    container.register::<A, _, _>(Lifetime::Transient, A).unwrap();
    container.register::<B, _, _>(Lifetime::Transient, B).unwrap();

    // Validation only checks that dependencies are registered
    assert!(container.validate().is_ok());
    assert!(container.resolve::<B>(None).is_err());
    // The failed plan is not cached, so the error repeats
    assert!(matches!(
        container.resolve::<B>(None),
        Err(ResolutionError::CircularDependency { .. })
    ));
}

#![no_main]

use ferrous_lifecycle::{Container, Lifetime, RegistrationError, ResolutionError};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct TestService {
    value: i32,
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }

    let value = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let lifetime = match data[4] % 3 {
        0 => Lifetime::Transient,
        1 => Lifetime::Singleton,
        _ => Lifetime::Scoped,
    };
    let key = String::from_utf8_lossy(&data[5..]).into_owned();

    let container = Container::new();
    let registered = container.register_with_key::<TestService, _, _>(&key, lifetime, move || TestService { value });

    if key.trim().is_empty() {
        assert_eq!(registered, Err(RegistrationError::BlankKey));
        assert!(matches!(container.resolve_any(&key, None), Err(ResolutionError::BlankKey)));
        return;
    }
    assert!(registered.is_ok());

    // Second registration under the same key always loses
    let duplicate = container.register_with_key::<TestService, _, _>(&key, lifetime, || TestService { value: 0 });
    assert!(matches!(duplicate, Err(RegistrationError::Duplicate { .. })));

    let ctx = container.new_context();
    let service = container.resolve_with_key::<TestService>(&key, Some(&ctx)).unwrap();
    assert_eq!(service.value, value);

    assert!(container.remove_context(&ctx).is_ok());
    assert!(container.shutdown(None).is_empty());
});

use sovran_concurrent_map::{AnyConcurrentMap, DynKey, DynValue, MapError, TypeDescriptor};

// A registry of settings whose key/value types are chosen by a caller at runtime.
fn build_registry(kind: &str) -> AnyConcurrentMap {
    match kind {
        "ports" => AnyConcurrentMap::new(TypeDescriptor::of::<String>(), TypeDescriptor::of::<u16>()),
        _ => AnyConcurrentMap::new(TypeDescriptor::of::<String>(), TypeDescriptor::of::<String>()),
    }
}

fn main() -> Result<(), MapError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let ports = build_registry("ports");
    println!("registry typed as {} -> {}", ports.key_type(), ports.elem_type());

    ports.put("http".to_string(), 80u16)?;
    if let Some(previous) = ports.put("http".to_string(), 8080u16)? {
        println!("http moved from {}", previous);
    }

    // Entries arriving as erased boxes, e.g. from a plugin
    let incoming: Vec<(Box<dyn DynKey>, Box<dyn DynValue>)> = vec![
        (Box::new("https".to_string()), Box::new(443u16)),
        (Box::new("ssh".to_string()), Box::new(22u32)),
        (Box::new(25u16), Box::new(25u16)),
    ];

    for (key, value) in incoming {
        let label = format!("{:?} => {:?}", key, value);
        match ports.put_boxed(key, value) {
            Ok(_) => println!("accepted {}", label),
            Err(MapError::TypeMismatch { expected, found }) => {
                println!("rejected {}: expected {}, found {}", label, expected, found)
            }
            Err(e) => return Err(e),
        }
    }

    let mut names = ports.keys_as::<String>()?;
    names.sort();
    println!("names: {:?}", names);
    println!("{}", ports);

    if let Some(old) = ports.remove(&"http".to_string())? {
        println!("removed http ({:?})", old);
    }
    ports.clear()?;
    println!("after clear: {}", ports.len()?);

    Ok(())
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use spawnstream::source::payload::to_signal;

fuzz_target!(|data: &[u8]| {
    // As a JSON document, and as the bare string stdio delivers for non-JSON lines
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = to_signal(&value);
    }
    let text = String::from_utf8_lossy(data).into_owned();
    let _ = to_signal(&serde_json::Value::String(text));
});

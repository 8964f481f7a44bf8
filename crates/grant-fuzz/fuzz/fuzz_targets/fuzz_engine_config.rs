#![no_main]

use libfuzzer_sys::fuzz_target;
use oauth_grant_engine::config::MAX_TOKEN_LENGTH;
use oauth_grant_engine::{EngineConfig, GrantEngine, TokenOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(config) = EngineConfig::from_value(json.clone()) else {
        return;
    };

    // Construction either fails cleanly or yields an engine that can mint tokens.
    let Ok(engine) = GrantEngine::new(&config) else {
        return;
    };
    assert!(engine.access_token_length() <= MAX_TOKEN_LENGTH);
    assert!(engine.refresh_token_length() <= MAX_TOKEN_LENGTH);

    let options = serde_json::from_value::<TokenOptions>(json).ok();
    let token = engine.generate_token(options.as_ref()).expect("os rng");
    assert!(token.access_token.len() <= MAX_TOKEN_LENGTH && token.refresh_token.len() <= MAX_TOKEN_LENGTH);
    assert!(token.access_token_lifetime > 0 && token.refresh_token_lifetime >= 0);
});

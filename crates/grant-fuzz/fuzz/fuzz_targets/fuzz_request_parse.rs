#![no_main]

use libfuzzer_sys::fuzz_target;
use oauth_grant_engine::models::{Request, Token, TokenOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Ok(request) = serde_json::from_value::<Request>(json.clone()) {
            let _ = request.grant_type();
            let _ = request.body_str("refresh_token");
            let _ = request.header("authorization");
        }
        let _ = serde_json::from_value::<Token>(json.clone());
        let _ = serde_json::from_value::<TokenOptions>(json);
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use livescore_client::protocol::{CommentaryListResponse, MatchListResponse, ServerMessage};

fuzz_target!(|data: &[u8]| {
    // Realtime frames arrive as text; anything that parses must re-serialize.
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(msg) = serde_json::from_str::<ServerMessage>(text) {
            let _ = msg.kind();
            let _ = serde_json::to_string(&msg);
        }
    }

    // REST bodies go through the byte path.
    let _ = serde_json::from_slice::<MatchListResponse>(data);
    let _ = serde_json::from_slice::<CommentaryListResponse>(data);
});

// Verify the envelope wire format end to end against literal scenarios.
// These tests pin the upstream contract: strict user/assistant alternation,
// sanitized tool namespace, and the synthetic-turn rules.

use kirogate_translate::client::ChatRequest;
use kirogate_translate::translate::translate;

fn request(value: serde_json::Value) -> ChatRequest {
    serde_json::from_value(value).unwrap()
}

fn envelope(value: serde_json::Value) -> (serde_json::Value, std::collections::HashMap<String, String>) {
    let out = translate(&request(value), None).unwrap();
    (serde_json::to_value(&out.request).unwrap(), out.tool_names)
}

fn assert_alternation(state: &serde_json::Value) {
    let history = state["conversationState"]["history"].as_array().unwrap();
    assert_eq!(history.len() % 2, 0, "history length must be even");
    for (i, entry) in history.iter().enumerate() {
        if i % 2 == 0 {
            assert!(
                entry.get("userInputMessage").is_some(),
                "entry {i} should be a user turn"
            );
        } else {
            assert!(
                entry.get("assistantResponseMessage").is_some(),
                "entry {i} should be an assistant turn"
            );
        }
    }
    assert!(
        state["conversationState"]["currentMessage"]
            .get("userInputMessage")
            .is_some(),
        "current message must be a user turn"
    );
}

#[test]
fn single_user_text() {
    let (v, _) = envelope(serde_json::json!({
        "model": "claude-3-5-sonnet-latest",
        "messages": [{"role": "user", "content": "hi"}]
    }));
    let state = &v["conversationState"];
    assert_eq!(state["currentMessage"]["userInputMessage"]["content"], "hi");
    assert_eq!(state["history"].as_array().unwrap().len(), 0);
    assert_eq!(state["chatTriggerType"], "MANUAL");
    assert_eq!(state["agentTaskType"], "vibe");
    assert!(state["currentMessage"]["userInputMessage"]["modelId"]
        .as_str()
        .is_some_and(|m| !m.is_empty()));
    assert_eq!(
        state["currentMessage"]["userInputMessage"]["origin"],
        "AI_EDITOR"
    );
    assert_alternation(&v);
}

#[test]
fn assistant_suffix_synthesizes_continue() {
    let (v, _) = envelope(serde_json::json!({
        "model": "claude-sonnet-4",
        "messages": [
            {"role": "user", "content": "a"},
            {"role": "assistant", "content": "b"}
        ]
    }));
    let state = &v["conversationState"];
    assert_eq!(state["history"].as_array().unwrap().len(), 2);
    assert_eq!(
        state["currentMessage"]["userInputMessage"]["content"],
        "continue"
    );
    assert_alternation(&v);
}

#[test]
fn trailing_users_merge_into_current() {
    let (v, _) = envelope(serde_json::json!({
        "model": "claude-sonnet-4",
        "messages": [
            {"role": "user", "content": "x"},
            {"role": "assistant", "content": "y"},
            {"role": "user", "content": "p"},
            {"role": "user", "content": "q"}
        ]
    }));
    let state = &v["conversationState"];
    let history = state["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["userInputMessage"]["content"], "x");
    assert_eq!(history[1]["assistantResponseMessage"]["content"], "y");
    assert_eq!(
        state["currentMessage"]["userInputMessage"]["content"],
        "p\nq"
    );
    assert_alternation(&v);
}

#[test]
fn unsupported_tool_use_is_dropped() {
    let (v, map) = envelope(serde_json::json!({
        "model": "claude-sonnet-4",
        "messages": [
            {"role": "user", "content": [{"type": "text", "text": "run"}]},
            {"role": "assistant", "content": [
                {"type": "text", "text": "calling"},
                {"type": "tool_use", "id": "T1", "name": "web.search!", "input": {"q": "hi"}}
            ]},
            {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "T1", "content": "42"}
            ]}
        ]
    }));
    let state = &v["conversationState"];
    let assistant = &state["history"][1]["assistantResponseMessage"];
    assert_eq!(assistant["content"], "calling");
    assert!(assistant.get("toolUses").is_none());
    assert!(!map.contains_key("web.search!"));
    // the orphaned tool result still threads through
    let results = &state["currentMessage"]["userInputMessage"]["userInputMessageContext"]
        ["toolResults"];
    assert_eq!(results[0]["toolUseId"], "T1");
    assert_alternation(&v);
}

#[test]
fn tool_result_threading() {
    let (v, map) = envelope(serde_json::json!({
        "model": "claude-sonnet-4",
        "messages": [
            {"role": "user", "content": [{"type": "text", "text": "run"}]},
            {"role": "assistant", "content": [
                {"type": "text", "text": "calling"},
                {"type": "tool_use", "id": "T1", "name": "do.thing", "input": {"q": "hi"}}
            ]},
            {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "T1", "content": "42"}
            ]}
        ]
    }));
    let state = &v["conversationState"];
    let assistant = &state["history"][1]["assistantResponseMessage"];
    assert_eq!(assistant["toolUses"][0]["name"], "do_thing");
    assert_eq!(assistant["toolUses"][0]["toolUseId"], "T1");
    assert_eq!(assistant["toolUses"][0]["input"], serde_json::json!({"q": "hi"}));
    assert_eq!(map["do.thing"], "do_thing");

    let current = &state["currentMessage"]["userInputMessage"];
    assert_eq!(current["content"], "continue");
    let results = &current["userInputMessageContext"]["toolResults"];
    assert_eq!(results[0]["toolUseId"], "T1");
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[0]["content"][0]["text"], "42");
    assert_alternation(&v);
}

#[test]
fn thinking_plus_system_injection() {
    let (v, _) = envelope(serde_json::json!({
        "model": "claude-sonnet-4",
        "system": "S",
        "thinking": {"type": "enabled", "budget_tokens": 4096},
        "messages": [{"role": "user", "content": "hi"}]
    }));
    let history = v["conversationState"]["history"].as_array().unwrap();
    assert_eq!(
        history[0]["userInputMessage"]["content"],
        "<thinking_mode>enabled</thinking_mode><max_thinking_length>4096</max_thinking_length>\nS"
    );
    assert_eq!(
        history[1]["assistantResponseMessage"]["content"],
        "I will follow these instructions."
    );
    assert_alternation(&v);
}

#[test]
fn colliding_tool_names_get_suffixes() {
    let (v, map) = envelope(serde_json::json!({
        "model": "claude-sonnet-4",
        "messages": [{"role": "user", "content": "hi"}],
        "tools": [
            {"name": "a!", "description": "first", "input_schema": {}},
            {"name": "a?", "description": "second", "input_schema": {}}
        ]
    }));
    assert_eq!(map["a!"], "a_");
    assert_eq!(map["a?"], "a__2");
    let tools = v["conversationState"]["currentMessage"]["userInputMessage"]
        ["userInputMessageContext"]["tools"]
        .as_array()
        .unwrap();
    assert_eq!(tools[0]["toolSpecification"]["name"], "a_");
    assert_eq!(tools[1]["toolSpecification"]["name"], "a__2");
}

#[test]
fn every_envelope_tool_name_is_sanitized_and_mapped() {
    let out = translate(
        &request(serde_json::json!({
            "model": "claude-sonnet-4",
            "messages": [
                {"role": "user", "content": "go"},
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "T1", "name": "do.thing", "input": {}},
                    {"type": "tool_use", "id": "T2", "name": "3 weird name!", "input": {}}
                ]},
                {"role": "user", "content": "more"}
            ],
            "tools": [
                {"name": "do.thing", "description": "", "input_schema": {}},
                {"name": "another/tool", "description": "", "input_schema": {}}
            ]
        })),
        None,
    )
    .unwrap();

    let v = serde_json::to_value(&out.request).unwrap();
    let mut seen = Vec::new();
    collect_tool_names(&v, &mut seen);
    assert!(!seen.is_empty());
    for name in &seen {
        assert!(is_identifier(name), "bad tool name on the wire: {name:?}");
        assert!(
            out.tool_names.values().any(|v| v == name),
            "{name:?} missing from the name map"
        );
    }
    // injectivity: sanitized names never collide
    let values: std::collections::HashSet<_> = out.tool_names.values().collect();
    assert_eq!(values.len(), out.tool_names.len());
}

#[test]
fn identical_input_differs_only_in_generated_ids() {
    let input = serde_json::json!({
        "model": "claude-sonnet-4",
        "system": "S",
        "messages": [
            {"role": "user", "content": "x"},
            {"role": "assistant", "content": "y"},
            {"role": "user", "content": "p"}
        ]
    });
    let (mut a, _) = envelope(input.clone());
    let (mut b, _) = envelope(input);
    for v in [&mut a, &mut b] {
        v["conversationState"]["conversationId"] = serde_json::json!("X");
        v["conversationState"]["agentContinuationId"] = serde_json::json!("X");
    }
    assert_eq!(a, b);
}

#[test]
fn alternation_holds_for_awkward_shapes() {
    let shapes = [
        serde_json::json!([{"role": "assistant", "content": "solo"}]),
        serde_json::json!([
            {"role": "assistant", "content": "a1"},
            {"role": "assistant", "content": "a2"},
            {"role": "user", "content": "u"}
        ]),
        serde_json::json!([
            {"role": "user", "content": "u1"},
            {"role": "user", "content": "u2"},
            {"role": "assistant", "content": "a"},
            {"role": "assistant", "content": "b"}
        ]),
        serde_json::json!([
            {"role": "user", "content": ""},
            {"role": "assistant", "content": ""},
            {"role": "user", "content": "tail"}
        ]),
    ];
    for messages in shapes {
        let (v, _) = envelope(serde_json::json!({
            "model": "claude-sonnet-4",
            "messages": messages
        }));
        assert_alternation(&v);
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn collect_tool_names(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map {
                if key == "toolUses" {
                    if let Some(uses) = v.as_array() {
                        for u in uses {
                            if let Some(name) = u["name"].as_str() {
                                out.push(name.to_string());
                            }
                        }
                    }
                } else if key == "tools" {
                    if let Some(tools) = v.as_array() {
                        for t in tools {
                            if let Some(name) = t["toolSpecification"]["name"].as_str() {
                                out.push(name.to_string());
                            }
                        }
                    }
                }
                collect_tool_names(v, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_tool_names(item, out);
            }
        }
        _ => {}
    }
}

use serde_json::Value;

/// Canonical view of a voice-platform webhook event. The platform delivers
/// three payload shapes: a nested tool/function call whose `arguments` field
/// is a JSON string, a flat function call with top-level `query` fields, and
/// the standard message envelope for call lifecycle events.
#[derive(Debug, Clone, Default)]
pub struct CallEvent {
    pub call_id: String,
    pub event_type: String,
    pub caller_number: Option<String>,
    pub called_number: Option<String>,
    pub assistant_id: Option<String>,
    pub transcript: String,
    pub tool_call_id: Option<String>,
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

fn tool_call_id(payload: &Value) -> Option<String> {
    payload
        .get("toolCalls")
        .and_then(Value::as_array)
        .and_then(|calls| calls.first())
        .and_then(|c| str_field(c, "id"))
        .or_else(|| str_field(payload, "id"))
}

pub fn extract_call_event(payload: &Value) -> CallEvent {
    // Tool/function call with arguments serialized as a JSON string.
    if let Some(args_str) = payload
        .get("function")
        .and_then(|f| f.get("arguments"))
        .and_then(Value::as_str)
    {
        let args: Value = serde_json::from_str(args_str).unwrap_or(Value::Null);
        return CallEvent {
            call_id: str_field(payload, "call_id").unwrap_or_else(|| "function_call".to_string()),
            event_type: "function-call".to_string(),
            caller_number: str_field(&args, "caller_number")
                .or_else(|| str_field(&args, "phone_number")),
            called_number: str_field(&args, "phone_number"),
            assistant_id: str_field(&args, "assistant_id"),
            transcript: str_field(&args, "query").unwrap_or_default(),
            tool_call_id: tool_call_id(payload),
        };
    }

    // Flat function call with the parameters at the top level.
    if payload.get("query").is_some()
        || payload.get("phone_number").is_some()
        || payload.get("caller_number").is_some()
    {
        return CallEvent {
            call_id: str_field(payload, "call_id").unwrap_or_else(|| "function_call".to_string()),
            event_type: "function-call".to_string(),
            caller_number: str_field(payload, "caller_number")
                .or_else(|| str_field(payload, "phone_number")),
            called_number: str_field(payload, "phone_number"),
            assistant_id: str_field(payload, "assistant_id"),
            transcript: str_field(payload, "query").unwrap_or_default(),
            tool_call_id: tool_call_id(payload),
        };
    }

    // Standard message envelope. `message` may also be a bare string carrying
    // the transcript.
    let message = payload.get("message").cloned().unwrap_or(Value::Null);
    let message_obj = if message.is_object() {
        message.clone()
    } else {
        Value::Null
    };
    let call = message_obj.get("call").cloned().unwrap_or(Value::Null);
    let customer = message_obj.get("customer").cloned().unwrap_or(Value::Null);

    let transcript = str_field(&message_obj, "transcript")
        .or_else(|| str_field(payload, "transcript"))
        .or_else(|| message.as_str().map(str::to_string))
        .unwrap_or_default();

    CallEvent {
        call_id: str_field(&call, "id")
            .or_else(|| str_field(payload, "call_id"))
            .unwrap_or_else(|| "unknown".to_string()),
        event_type: str_field(&message_obj, "type")
            .or_else(|| str_field(payload, "event"))
            .unwrap_or_else(|| "unknown".to_string()),
        caller_number: str_field(&customer, "number").or_else(|| str_field(payload, "from")),
        called_number: str_field(&call, "phoneNumber")
            .or_else(|| str_field(&call, "phoneNumberId")),
        assistant_id: str_field(&call, "assistantId"),
        transcript,
        tool_call_id: tool_call_id(payload),
    }
}

/// Practice lookup key from a webhook payload: called number first (the
/// multi-practice case), then assistant id, then explicit tenant metadata.
pub fn identify_practice(payload: &Value) -> Option<String> {
    let message = payload.get("message").cloned().unwrap_or(Value::Null);
    let call = message.get("call").cloned().unwrap_or(Value::Null);

    if let Some(number) = str_field(&call, "phoneNumber")
        .or_else(|| str_field(&call, "phoneNumberId"))
        .or_else(|| str_field(payload, "phoneNumber"))
        .or_else(|| str_field(payload, "phone_number"))
    {
        return Some(number);
    }

    if let Some(assistant) =
        str_field(&call, "assistantId").or_else(|| str_field(payload, "assistantId"))
    {
        return Some(assistant);
    }

    for source in [&call, &message, payload] {
        if let Some(metadata) = source.get("metadata") {
            if let Some(id) = str_field(metadata, "practice_id")
                .or_else(|| str_field(metadata, "tenant_id"))
                .or_else(|| str_field(metadata, "practiceId"))
            {
                return Some(id);
            }
        }
    }

    None
}

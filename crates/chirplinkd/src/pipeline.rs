//! The application boundary: turning a decoded request into a response.

use chirplink_core::frame::Message;

/// Synchronous request/response processing, called once per completed
/// inbound message.
pub trait Pipeline {
    fn process(&self, message: Message) -> Message;
}

/// The development/hardware-bring-up responder. Echoes the function name
/// and content back with a success status; malformed input gets an error
/// response with no id.
pub struct EchoPipeline;

impl Pipeline for EchoPipeline {
    fn process(&self, message: Message) -> Message {
        let Some(function) = message.function.clone() else {
            return Message::new("", "invalid message format").with_status("E");
        };
        Message::new(
            message.id.clone(),
            format!("Processed function {function} with content: {}", message.ct),
        )
        .with_status("S")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_function_and_content() {
        let pipeline = EchoPipeline;
        let request = Message::new("0000001", "hi").with_function("echo");
        let response = pipeline.process(request);
        assert_eq!(response.id, "0000001");
        assert_eq!(response.status.as_deref(), Some("S"));
        assert_eq!(response.ct, "Processed function echo with content: hi");
    }

    #[test]
    fn missing_function_is_an_error_response() {
        let pipeline = EchoPipeline;
        let request = Message::new("0000001", "hi");
        let response = pipeline.process(request);
        assert_eq!(response.id, "");
        assert_eq!(response.status.as_deref(), Some("E"));
        assert_eq!(response.ct, "invalid message format");
    }
}

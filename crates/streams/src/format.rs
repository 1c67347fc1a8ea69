use crate::event::Event;

const FALLBACK_HEADLINE: &str = "New event";

/// Render an event as the message text delivered to subscribers.
#[must_use]
pub fn format_event(stream_name: &str, event: &Event) -> String {
    match event {
        Event::Text(text) | Event::Other(text) => format!("[{stream_name}] {text}"),
        Event::Structured {
            message,
            details,
            url,
        } => {
            let headline = message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(FALLBACK_HEADLINE);
            let mut lines = vec![format!("[{stream_name}] {headline}")];
            lines.extend(
                [details, url]
                    .into_iter()
                    .filter_map(|line| line.as_deref().map(str::trim))
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
            lines.join("\n")
        },
    }
}

//! Sink that writes deliveries to a terminal or any other writer.

use std::{io::Write, sync::Mutex};

use {async_trait::async_trait, tracing::debug};

use crate::{
    Error, Result,
    sink::{ChannelId, DeliverySink, UserId},
};

/// Prints every delivery as a block headed by its destination.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn write_block(&self, header: &str, text: &str) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "── {header}")
            .and_then(|()| writeln!(out, "{text}"))
            .and_then(|()| out.flush())
            .map_err(|e| Error::external("console write", e))
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

#[async_trait]
impl DeliverySink for ConsoleSink {
    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<()> {
        debug!(user_id, len = text.len(), "console direct delivery");
        self.write_block(&format!("dm {user_id}"), text)
    }

    async fn send_to_channel(&self, channel_id: ChannelId, text: &str) -> Result<()> {
        debug!(channel_id, len = text.len(), "console channel delivery");
        self.write_block(&format!("channel {channel_id}"), text)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn writes_header_and_text() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::new(Box::new(buf.clone()));

        sink.send_direct(42, "[news] hello").await.unwrap();
        sink.send_to_channel(7, "<@42> [news] hello").await.unwrap();

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            written,
            "── dm 42\n[news] hello\n── channel 7\n<@42> [news] hello\n"
        );
    }

    #[test]
    fn default_mention_format() {
        assert_eq!(ConsoleSink::stdout().mention(99), "<@99>");
    }
}

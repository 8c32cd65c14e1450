use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use crate::progress::ProgressTracker;

/// Pass-through reader that reports every successful read to a progress slot.
///
/// Works over any `AsyncRead`; it neither buffers nor retries.
pub struct InstrumentedReader<R> {
    inner: R,
    tracker: Arc<ProgressTracker>,
    index: usize,
}

impl<R> InstrumentedReader<R> {
    pub fn new(inner: R, tracker: Arc<ProgressTracker>, index: usize) -> Self {
        Self {
            inner,
            tracker,
            index,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for InstrumentedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let n = buf.filled().len() - before;
            this.tracker.advance(this.index, n as u64);
        }
        poll
    }
}

//! # Module Ports
//!
//! Named, typed endpoints between pipeline modules. An [`Output`] is
//! connected to an [`Input`] with [`attach`]; values then flow over a
//! bounded `mpsc` channel.
//!
//! All attachments must be made before the receiving module starts. The
//! input drops its own sender on the first receive, so it observes the end
//! of the stream once every attached output is gone.

use tokio::sync::mpsc;

pub struct Input<T> {
    name: &'static str,
    sender: Option<mpsc::Sender<T>>,
    receiver: mpsc::Receiver<T>,
}

impl<T> Input<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            name,
            sender: Some(sender),
            receiver,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Next value; `None` once all attached outputs are dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.sender.take();
        self.receiver.recv().await
    }
}

/// Sending endpoint. Unattached outputs discard values.
pub struct Output<T> {
    name: &'static str,
    senders: Vec<mpsc::Sender<T>>,
}

impl<T: Clone + Send> Output<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            senders: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_attached(&self) -> bool {
        !self.senders.is_empty()
    }

    /// Sends `value` to every attached input, waiting for buffer space.
    ///
    /// Returns how many inputs received it; inputs whose module has exited
    /// are detached.
    pub async fn push(&mut self, value: T) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (i, sender) in self.senders.iter().enumerate() {
            if sender.send(value.clone()).await.is_ok() {
                delivered += 1;
            } else {
                closed.push(i);
            }
        }
        for i in closed.into_iter().rev() {
            self.senders.remove(i);
        }
        delivered
    }
}

/// Connects `output` to `input`.
///
/// Attaching to an input that has already started receiving has no effect.
pub fn attach<T: Clone + Send>(output: &mut Output<T>, input: &Input<T>) {
    if let Some(sender) = &input.sender {
        output.senders.push(sender.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attached_output_delivers() {
        let mut input = Input::new("blocks", 4);
        let mut output = Output::new("blocks");
        attach(&mut output, &input);

        assert_eq!(output.push(7u64).await, 1);
        drop(output);

        assert_eq!(input.recv().await, Some(7));
        assert_eq!(input.recv().await, None);
    }

    #[tokio::test]
    async fn test_fan_out_to_two_inputs() {
        let mut first = Input::new("a", 1);
        let mut second = Input::new("b", 1);
        let mut output = Output::new("out");
        attach(&mut output, &first);
        attach(&mut output, &second);

        assert_eq!(output.push("head".to_string()).await, 2);

        assert_eq!(first.recv().await.as_deref(), Some("head"));
        assert_eq!(second.recv().await.as_deref(), Some("head"));
    }

    #[tokio::test]
    async fn test_unattached_output_discards() {
        let mut output: Output<u64> = Output::new("halt");
        assert!(!output.is_attached());
        assert_eq!(output.push(1).await, 0);
    }

    #[tokio::test]
    async fn test_closed_input_is_detached() {
        let input = Input::new("blocks", 1);
        let mut output = Output::new("blocks");
        attach(&mut output, &input);
        drop(input);

        assert_eq!(output.push(1u64).await, 0);
        assert!(!output.is_attached());
    }
}

use crate::config::Config;
use crate::protocol::StatusMessage;
use anyhow::Context;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

#[derive(Debug, PartialEq)]
pub enum GuiEvent {
    Message(String),
}

pub struct GuiBridge {
    socket: UdpSocket,
    target_addr: String,
    tx: mpsc::Sender<GuiEvent>,
    buffer_size: usize,
}

// GUI进程和Core进程通过本地UDP通信，端口在配置中指定
impl GuiBridge {
    pub async fn new(config: &Config, tx: mpsc::Sender<GuiEvent>) -> anyhow::Result<Self> {
        Self::bind(
            &format!("{}:{}", config.gui_local_ip, config.gui_local_port),
            &format!("{}:{}", config.gui_remote_ip, config.gui_remote_port),
            config.gui_buffer_size,
            tx,
        )
        .await
    }

    pub async fn bind(
        local_addr: &str,
        target_addr: &str,
        buffer_size: usize,
        tx: mpsc::Sender<GuiEvent>,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(local_addr)
            .await
            .with_context(|| format!("Failed to bind GUI socket on {}", local_addr))?;

        Ok(Self {
            socket,
            target_addr: target_addr.to_string(),
            tx,
            buffer_size,
        })
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let (len, _) = self.socket.recv_from(&mut buf).await?;
            if len == 0 {
                continue;
            }
            match std::str::from_utf8(&buf[..len]) {
                Ok(msg) => {
                    if let Err(e) = self.tx.send(GuiEvent::Message(msg.to_string())).await {
                        log::error!("Failed to send GUI event: {}", e);
                        break;
                    }
                }
                Err(e) => log::warn!("Dropping non UTF-8 GUI datagram: {}", e),
            }
        }
        Ok(())
    }

    pub async fn send_message(&self, msg: &str) -> anyhow::Result<()> {
        self.socket
            .send_to(msg.as_bytes(), &self.target_addr)
            .await?;
        Ok(())
    }

    pub async fn send_status(&self, status: &StatusMessage) -> anyhow::Result<()> {
        let text = serde_json::to_string(status)?;
        self.send_message(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_round_trip_with_gui() {
        let gui = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let bridge = Arc::new(
            GuiBridge::bind("127.0.0.1:0", &gui.local_addr().unwrap().to_string(), 512, tx)
                .await
                .unwrap(),
        );
        let bridge_addr = bridge.socket.local_addr().unwrap();

        let runner = bridge.clone();
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        gui.send_to(br#"{"type":"get_locales"}"#, bridge_addr)
            .await
            .unwrap();
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, GuiEvent::Message(r#"{"type":"get_locales"}"#.to_string()));

        bridge
            .send_status(&StatusMessage::success("get_locales"))
            .await
            .unwrap();
        let mut buf = [0u8; 512];
        let (len, _) = timeout(Duration::from_secs(2), gui.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let status: StatusMessage = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(status, StatusMessage::success("get_locales"));
    }
}

//! Open/close lifecycle shared by all iotsa-backed devices.

use async_trait::async_trait;

use super::DeviceError;
use crate::iotsa::{IotsaConfig, IotsaDevice};

/// A device reached through one iotsa server.
///
/// `open` runs `pre_open`, resolves the hostname and checks the device is
/// accessible, then runs `post_open`. `close` runs `pre_close` and
/// `post_close` and drops the connection. Implementors only override the
/// hooks they need.
#[async_trait]
pub trait IotsaModule: Sized + Send + Sync {
    /// Device kind used in log lines.
    const KIND: &'static str;

    fn from_device(device: IotsaDevice) -> Self;

    fn device(&self) -> &IotsaDevice;

    fn hostname(&self) -> &str {
        self.device().hostname()
    }

    /// Runs before any network traffic; an error aborts the open.
    async fn pre_open(_hostname: &str, _config: &IotsaConfig) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn post_open(&self) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn pre_close(&self) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn post_close(&self) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn open(hostname: &str, config: IotsaConfig) -> Result<Self, DeviceError> {
        Self::pre_open(hostname, &config).await?;
        let device = IotsaDevice::connect(hostname, config).await?;
        let module = Self::from_device(device);
        module.post_open().await?;
        tracing::info!(
            "{} {} opened at {}",
            Self::KIND,
            hostname,
            module.device().address()
        );
        Ok(module)
    }

    async fn close(self) -> Result<(), DeviceError> {
        self.pre_close().await?;
        self.post_close().await?;
        tracing::info!("{} {} closed", Self::KIND, self.hostname());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iotsa::stub::StubServer;
    use std::sync::Mutex;

    static HOOKS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    struct Recorder {
        device: IotsaDevice,
    }

    #[async_trait]
    impl IotsaModule for Recorder {
        const KIND: &'static str = "Recorder";

        fn from_device(device: IotsaDevice) -> Self {
            HOOKS.lock().unwrap().push("connected");
            Self { device }
        }

        fn device(&self) -> &IotsaDevice {
            &self.device
        }

        async fn pre_open(_hostname: &str, _config: &IotsaConfig) -> Result<(), DeviceError> {
            HOOKS.lock().unwrap().push("pre_open");
            Ok(())
        }

        async fn post_open(&self) -> Result<(), DeviceError> {
            HOOKS.lock().unwrap().push("post_open");
            Ok(())
        }

        async fn pre_close(&self) -> Result<(), DeviceError> {
            HOOKS.lock().unwrap().push("pre_close");
            Ok(())
        }

        async fn post_close(&self) -> Result<(), DeviceError> {
            HOOKS.lock().unwrap().push("post_close");
            Ok(())
        }
    }

    struct Refusing {
        device: IotsaDevice,
    }

    #[async_trait]
    impl IotsaModule for Refusing {
        const KIND: &'static str = "Refusing";

        fn from_device(device: IotsaDevice) -> Self {
            Self { device }
        }

        fn device(&self) -> &IotsaDevice {
            &self.device
        }

        async fn pre_open(hostname: &str, _config: &IotsaConfig) -> Result<(), DeviceError> {
            Err(DeviceError::Other(format!("{} is not allowed", hostname)))
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_order() {
        let server = StubServer::start(|_, _| (200, "{}".to_string())).await;
        let config = IotsaConfig::default().with_port(server.port);

        let module = Recorder::open("127.0.0.1", config).await.unwrap();
        assert_eq!(module.hostname(), "127.0.0.1");
        assert_eq!(*HOOKS.lock().unwrap(), vec!["pre_open", "connected", "post_open"]);

        // Accessibility check happens between the open hooks
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/api/config");

        module.close().await.unwrap();
        assert_eq!(
            *HOOKS.lock().unwrap(),
            vec!["pre_open", "connected", "post_open", "pre_close", "post_close"]
        );
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_pre_open_skips_connect() {
        let server = StubServer::start(|_, _| (200, "{}".to_string())).await;
        let config = IotsaConfig::default().with_port(server.port);

        let err = match Refusing::open("127.0.0.1", config).await {
            Ok(_) => panic!("open should fail"),
            Err(e) => e,
        };
        assert_eq!(err.to_string(), "127.0.0.1 is not allowed");
        assert!(server.requests().is_empty());
    }
}

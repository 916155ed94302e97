use futures::future::BoxFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Any error a [`Handler`] raises, or one encountered while decoding a
/// request / sending a reply, is swallowed per-request (§4.3) — this is
/// the single error type every such failure is coerced into for logging.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// §4.3's "user-supplied handler(request) -> reply". One call handles a
/// single decoded request and returns the bytes to write back.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Vec<u8>) -> Result<Vec<u8>, HandlerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

/// The datagram size bound from §4.3.
const UDP_MAX_DATAGRAM: usize = 65535;
/// TCP read chunk size from §4.3; a short read ends the message.
const TCP_READ_CHUNK: usize = 1024;

/// §9's "make [the simulated delay] configurable, including zero for
/// tests" applied to the 100ms delay §4.3 mandates around every handler
/// invocation.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub simulated_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            simulated_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Clone)]
enum Bound {
    Udp(Arc<UdpSocket>),
    Tcp(Arc<TcpListener>),
}

/// §4.3 RequestServer: binds one UDP or TCP socket and dispatches every
/// accepted request to its own worker. Owns the socket and the running
/// flag; the handler is invoked by reference, never owned.
pub struct RequestServer<H> {
    address: SocketAddr,
    transport: Transport,
    handler: Arc<H>,
    config: ServerConfig,
    bound: Mutex<Option<Bound>>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<H: Handler + 'static> RequestServer<H> {
    pub fn new(address: SocketAddr, transport: Transport, handler: H, config: ServerConfig) -> Self {
        Self {
            address,
            transport,
            handler: Arc::new(handler),
            config,
            bound: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(Notify::new()),
            task: Mutex::new(None),
        }
    }

    /// Binds the socket (TCP also starts listening). Must precede [`Self::run`].
    #[tracing::instrument(skip(self), fields(address = %self.address, transport = ?self.transport))]
    pub async fn open_socket(&self) -> std::io::Result<()> {
        let bound = match self.transport {
            Transport::Udp => Bound::Udp(Arc::new(UdpSocket::bind(self.address).await?)),
            Transport::Tcp => Bound::Tcp(Arc::new(TcpListener::bind(self.address).await?)),
        };
        tracing::info!("bound");
        *self.bound.lock().expect("bound mutex poisoned") = Some(bound);
        Ok(())
    }

    /// Begins accepting. When `in_background`, accepting runs on its own
    /// task and this returns immediately; otherwise it blocks until
    /// [`Self::stop_listening`] is called.
    pub async fn run(&self, in_background: bool) -> std::io::Result<()> {
        let bound = self
            .bound
            .lock()
            .expect("bound mutex poisoned")
            .clone()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotConnected, "open_socket was not called")
            })?;

        self.running.store(true, Ordering::SeqCst);

        let fut = accept_loop(
            bound,
            self.handler.clone(),
            self.running.clone(),
            self.stop.clone(),
            self.config.simulated_delay,
        );

        if in_background {
            let handle = tokio::spawn(fut);
            *self.task.lock().expect("task mutex poisoned") = Some(handle);
        } else {
            fut.await;
        }
        Ok(())
    }

    /// Cooperative: the accept worker exits on its next loop turn. The
    /// socket is deliberately left open.
    pub fn stop_listening(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_one();
    }
}

fn accept_loop<H: Handler + 'static>(
    bound: Bound,
    handler: Arc<H>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    delay: Duration,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        match bound {
            Bound::Udp(socket) => udp_accept_loop(socket, handler, running, stop, delay).await,
            Bound::Tcp(listener) => tcp_accept_loop(listener, handler, running, stop, delay).await,
        }
    })
}

async fn udp_accept_loop<H: Handler + 'static>(
    socket: Arc<UdpSocket>,
    handler: Arc<H>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    delay: Duration,
) {
    let mut buffer = vec![0u8; UDP_MAX_DATAGRAM];
    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        tokio::select! {
            _ = stop.notified() => break,
            received = socket.recv_from(&mut buffer) => {
                match received {
                    Ok((size, from)) => {
                        let request = buffer[..size].to_vec();
                        let socket = socket.clone();
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(error) = handle_udp_request(socket, handler, request, from, delay).await {
                                tracing::debug!(%error, "dropping udp request");
                            }
                        });
                    }
                    Err(error) => tracing::warn!(%error, "udp recv_from failed"),
                }
            }
        }
    }
}

async fn handle_udp_request<H: Handler>(
    socket: Arc<UdpSocket>,
    handler: Arc<H>,
    request: Vec<u8>,
    from: SocketAddr,
    delay: Duration,
) -> Result<(), HandlerError> {
    tokio::time::sleep(delay).await;
    let reply = handler.handle(request).await?;
    tokio::time::sleep(delay).await;
    socket.send_to(&reply, from).await?;
    Ok(())
}

async fn tcp_accept_loop<H: Handler + 'static>(
    listener: Arc<TcpListener>,
    handler: Arc<H>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    delay: Duration,
) {
    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        tokio::select! {
            _ = stop.notified() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _from)) => {
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(error) = handle_tcp_connection(stream, handler, delay).await {
                                tracing::debug!(%error, "dropping tcp request");
                            }
                        });
                    }
                    Err(error) => tracing::warn!(%error, "tcp accept failed"),
                }
            }
        }
    }
}

async fn handle_tcp_connection<H: Handler>(
    mut stream: TcpStream,
    handler: Arc<H>,
    delay: Duration,
) -> Result<(), HandlerError> {
    let mut request = Vec::new();
    let mut chunk = [0u8; TCP_READ_CHUNK];
    loop {
        let read = stream.read(&mut chunk).await?;
        request.extend_from_slice(&chunk[..read]);
        if read < TCP_READ_CHUNK {
            break;
        }
    }

    tokio::time::sleep(delay).await;
    let reply = handler.handle(request).await?;
    tokio::time::sleep(delay).await;
    stream.write_all(&reply).await?;
    Ok(())
    // `stream` is dropped here on every exit path, including `?` above.
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::net::TcpStream as ClientTcpStream;

    struct EchoHandler {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Handler for EchoHandler {
        async fn handle(&self, request: Vec<u8>) -> Result<Vec<u8>, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(request)
        }
    }

    fn no_delay_config() -> ServerConfig {
        ServerConfig {
            simulated_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn udp_echoes_concurrent_requests() {
        let server = RequestServer::new(
            "127.0.0.1:0".parse().unwrap(),
            Transport::Udp,
            EchoHandler { calls: AtomicUsize::new(0) },
            no_delay_config(),
        );
        server.open_socket().await.unwrap();
        let local_addr = {
            let bound = server.bound.lock().unwrap();
            match bound.as_ref().unwrap() {
                Bound::Udp(socket) => socket.local_addr().unwrap(),
                Bound::Tcp(_) => unreachable!(),
            }
        };
        server.run(true).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let addr = local_addr;
            handles.push(tokio::spawn(async move {
                let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
                let payload = vec![i; 4];
                client.send_to(&payload, addr).await.unwrap();
                let mut buf = [0u8; 16];
                let (size, _) = client.recv_from(&mut buf).await.unwrap();
                assert_eq!(&buf[..size], payload.as_slice());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        server.stop_listening();
    }

    #[tokio::test]
    async fn tcp_reads_until_short_chunk_and_replies() {
        let server = RequestServer::new(
            "127.0.0.1:0".parse().unwrap(),
            Transport::Tcp,
            EchoHandler { calls: AtomicUsize::new(0) },
            no_delay_config(),
        );
        server.open_socket().await.unwrap();
        let local_addr = {
            let bound = server.bound.lock().unwrap();
            match bound.as_ref().unwrap() {
                Bound::Tcp(listener) => listener.local_addr().unwrap(),
                Bound::Udp(_) => unreachable!(),
            }
        };
        server.run(true).await.unwrap();

        let mut stream = ClientTcpStream::connect(local_addr).await.unwrap();
        stream.write_all(b"hello").await.unwrap();
        stream.shutdown().await.unwrap();

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.unwrap();
        assert_eq!(reply, b"hello");

        server.stop_listening();
    }

    #[tokio::test]
    async fn stop_listening_leaves_socket_bound() {
        let server = RequestServer::new(
            "127.0.0.1:0".parse().unwrap(),
            Transport::Udp,
            EchoHandler { calls: AtomicUsize::new(0) },
            no_delay_config(),
        );
        server.open_socket().await.unwrap();
        server.run(true).await.unwrap();
        server.stop_listening();
        // the bound socket handle is still present after stopping
        assert!(server.bound.lock().unwrap().is_some());
    }
}

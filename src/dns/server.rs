use crate::config::SharedConfig;
use crate::dns::challenge::ChallengeProvider;
use crate::dns::handlers::Handler;
use crate::dns::records::StaticRecords;
use crate::dns::resolver::Resolver;
use crate::error::Error;
use crate::store::DynAccountStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use trust_dns_server::ServerFuture;

/// The bound UDP and TCP DNS servers. Each transport runs its own [`Resolver`], sharing the
/// static zone and the store.
pub struct DnsServers {
    pub udp: ServerFuture<Handler>,
    pub tcp: ServerFuture<Handler>,
    pub udp_addr: SocketAddr,
    pub tcp_addr: SocketAddr,
    /// Presents the server's own challenge on both transports.
    pub challenges: ChallengeProvider,
}

impl DnsServers {
    /// Serve both transports until either fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DNSError`] if either server stops with an error.
    pub async fn block_until_done(self) -> Result<(), Error> {
        tokio::try_join!(self.udp.block_until_done(), self.tcp.block_until_done())?;
        Ok(())
    }
}

pub async fn new(config: SharedConfig, store: DynAccountStore) -> anyhow::Result<DnsServers> {
    let records = Arc::new(StaticRecords::from_config(&config)?);
    let udp_resolver = Arc::new(Resolver::new(&config, records.clone(), store.clone())?);
    let tcp_resolver = Arc::new(Resolver::new(&config, records, store)?);
    let challenges =
        ChallengeProvider::new(vec![udp_resolver.own_challenge(), tcp_resolver.own_challenge()]);

    let udp_socket = UdpSocket::bind(config.dns_udp_bind_addr).await?;
    let udp_addr = udp_socket.local_addr()?;
    let mut udp = ServerFuture::new(Handler::new(udp_resolver));
    udp.register_socket(udp_socket);

    let tcp_listener = TcpListener::bind(config.dns_tcp_bind_addr).await?;
    let tcp_addr = tcp_listener.local_addr()?;
    let mut tcp = ServerFuture::new(Handler::new(tcp_resolver));
    tcp.register_listener(tcp_listener, config.dns_tcp_timeout);

    Ok(DnsServers {
        udp,
        tcp,
        udp_addr,
        tcp_addr,
        challenges,
    })
}

use std::net::UdpSocket;

/// Guesses the local IP address of this machine.
///
/// Network speakers (Sonos, Chromecast) cannot resolve mDNS hostnames
/// reliably, so stream URLs must carry a numeric address. This opens a UDP
/// socket towards a public DNS server — no datagram is ever sent, the OS
/// simply reports which interface it would route through.
///
/// Falls back to `127.0.0.1` when no route is available.
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

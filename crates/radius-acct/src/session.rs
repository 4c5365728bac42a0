//! Per-session accounting state

use radius_proto::{compose_octets, split_octets};

/// Everything the worker knows about one tunnel session
///
/// Counters follow RFC 2869 Gigawords: the 64-bit totals are kept as a low
/// 32-bit word plus an overflow word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcctSession {
    pub username: String,
    pub session_id: String,
    pub nas_port: u32,
    pub calling_station_id: String,
    pub framed_ip: String,
    pub common_name: String,
    pub untrusted_port: String,
    /// `;`-separated Framed-Route entries
    pub framed_routes: String,
    /// Registry key assigned by the foreground process
    pub key: String,
    /// Lookup key into the status file, `commonname,ip:port`
    pub status_file_key: String,
    /// Opaque Vendor-Specific blob forwarded to the hook script
    pub vsa_buf: Vec<u8>,

    pub bytes_in: u32,
    pub bytes_out: u32,
    pub giga_in: u32,
    pub giga_out: u32,

    /// Unix seconds
    pub start_time: u64,
    /// Seconds between interim updates, 0 disables them
    pub interim_interval: u64,
    /// Unix seconds of the next interim update
    pub next_update: u64,
}

impl AcctSession {
    /// Stamp the session as started at `now`
    pub fn start_at(&mut self, now: u64) {
        self.start_time = now;
        self.next_update = now + self.interim_interval;
    }

    /// Whether the session belongs in the active partition
    pub fn is_active(&self) -> bool {
        self.interim_interval > 0
    }

    /// Replace the counters with new cumulative 64-bit totals
    pub fn set_counters(&mut self, total_in: u64, total_out: u64) {
        (self.giga_in, self.bytes_in) = split_octets(total_in);
        (self.giga_out, self.bytes_out) = split_octets(total_out);
    }

    pub fn total_in(&self) -> u64 {
        compose_octets(self.giga_in, self.bytes_in)
    }

    pub fn total_out(&self) -> u64 {
        compose_octets(self.giga_out, self.bytes_out)
    }

    /// Seconds since the session started, 0 if the clock went backwards
    pub fn session_time(&self, now: u64) -> u64 {
        now.saturating_sub(self.start_time)
    }

    /// Move the interim deadline forward by exactly one interval
    pub fn advance_update(&mut self) {
        self.next_update += self.interim_interval;
    }

    /// Route entries as sent by the foreground, surrounding whitespace kept
    pub fn framed_routes(&self) -> impl Iterator<Item = &str> {
        self.framed_routes.split(';').filter(|route| !route.is_empty())
    }
}

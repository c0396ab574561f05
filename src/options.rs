//! Client configuration.
//!
//! Plain option structs with defaults; the gateway's configuration layer
//! hydrates them from its own format and hands them over at construction.

use std::path::PathBuf;

use serde::Deserialize;

/// Options for the namespace client (gRPC metadata channel plus the
/// xrdcopy/eos child-process plumbing). Immutable after construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Force all backend requests to impersonate a single user. This is the
    /// case when access to the MGM is done from FUSE under apache or www-data.
    pub force_single_user_mode: bool,

    /// Username substituted for every request when
    /// `force_single_user_mode` is set. Defaults to `apache`.
    pub single_username: String,

    /// Authenticate child processes with an xrootd keytab.
    pub use_keytab: bool,

    /// Location of the keytab file, exported as `XrdSecSSSKT`.
    pub keytab: String,

    /// Comma-separated list of xrootd security protocols, e.g. `sss,unix`.
    /// Exported as `XrdSecPROTOCOL`.
    pub sec_protocol: String,

    /// Location of the eos binary.
    pub eos_binary: String,

    /// Location of the xrdcopy binary.
    pub xrdcopy_binary: String,

    /// URL of the MGM, e.g. `root://eos-example.org`.
    pub mgm_url: String,

    /// URI of the MGM gRPC endpoint.
    pub grpc_uri: String,

    /// Directory where reads and writes are staged.
    pub cache_directory: PathBuf,

    /// Shared secret presented on every gRPC request.
    pub authkey: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            force_single_user_mode: false,
            single_username: "apache".to_string(),
            use_keytab: false,
            keytab: String::new(),
            sec_protocol: String::new(),
            eos_binary: "/usr/bin/eos".to_string(),
            xrdcopy_binary: "/usr/bin/xrdcopy".to_string(),
            mgm_url: "root://eos-example.org".to_string(),
            grpc_uri: String::new(),
            cache_directory: std::env::temp_dir(),
            authkey: String::new(),
        }
    }
}

impl ClientOptions {
    /// Fill empty fields with their defaults. Deserialized configurations may
    /// carry empty strings for unset keys.
    pub fn apply_defaults(&mut self) {
        let d = Self::default();
        if self.single_username.is_empty() {
            self.single_username = d.single_username;
        }
        if self.eos_binary.is_empty() {
            self.eos_binary = d.eos_binary;
        }
        if self.xrdcopy_binary.is_empty() {
            self.xrdcopy_binary = d.xrdcopy_binary;
        }
        if self.mgm_url.is_empty() {
            self.mgm_url = d.mgm_url;
        }
        if self.cache_directory.as_os_str().is_empty() {
            self.cache_directory = d.cache_directory;
        }
    }
}

/// Options for the XrdHTTP data channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    /// HTTP(S) URL of the MGM.
    pub base_url: String,

    /// Timeout in seconds for connecting to the service.
    pub connect_timeout_s: u64,

    /// Timeout in seconds for a single request/response exchange. Does not
    /// include redirections.
    pub rw_timeout_s: u64,

    /// Timeout in seconds for a whole operation, including every
    /// redirection and retry. The hard deadline.
    pub op_timeout_s: u64,

    /// Connection-pool sizing. reqwest exposes only the per-host idle knobs;
    /// the global caps are kept for configuration compatibility.
    pub max_idle_conns: usize,
    pub max_conns_per_host: usize,
    pub max_idle_conns_per_host: usize,

    /// TTL in seconds for an idle pooled connection.
    pub idle_conn_timeout_s: u64,

    /// Client certificate and key for mutual TLS. Left empty, no client
    /// identity is presented.
    pub client_cert_file: String,
    pub client_key_file: String,

    /// Extra CA material: comma-separated PEM bundle files and directories
    /// scanned for PEM files. Grid deployments keep their CAs outside the
    /// system trust store.
    pub client_ca_files: String,
    pub client_ca_dirs: String,

    /// Safety bounds on the redirect/retry state machine. The operation-wide
    /// `op_timeout_s` still terminates the loop regardless.
    pub max_redirects: u32,
    pub max_retries: u32,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            base_url: "https://eos-example.org".to_string(),
            connect_timeout_s: 30,
            rw_timeout_s: 180,
            op_timeout_s: 360,
            max_idle_conns: 100,
            max_conns_per_host: 64,
            max_idle_conns_per_host: 8,
            idle_conn_timeout_s: 30,
            client_cert_file: String::new(),
            client_key_file: String::new(),
            client_ca_files: String::new(),
            client_ca_dirs: "/etc/grid-security/certificates".to_string(),
            max_redirects: 10,
            max_retries: 5,
        }
    }
}

impl HttpOptions {
    pub fn apply_defaults(&mut self) {
        let d = Self::default();
        if self.base_url.is_empty() {
            self.base_url = d.base_url;
        }
        if self.connect_timeout_s == 0 {
            self.connect_timeout_s = d.connect_timeout_s;
        }
        if self.rw_timeout_s == 0 {
            self.rw_timeout_s = d.rw_timeout_s;
        }
        if self.op_timeout_s == 0 {
            self.op_timeout_s = d.op_timeout_s;
        }
        if self.max_idle_conns == 0 {
            self.max_idle_conns = d.max_idle_conns;
        }
        if self.max_conns_per_host == 0 {
            self.max_conns_per_host = d.max_conns_per_host;
        }
        if self.max_idle_conns_per_host == 0 {
            self.max_idle_conns_per_host = d.max_idle_conns_per_host;
        }
        if self.idle_conn_timeout_s == 0 {
            self.idle_conn_timeout_s = d.idle_conn_timeout_s;
        }
        if self.client_ca_dirs.is_empty() {
            self.client_ca_dirs = d.client_ca_dirs;
        }
        if self.max_redirects == 0 {
            self.max_redirects = d.max_redirects;
        }
        if self.max_retries == 0 {
            self.max_retries = d.max_retries;
        }
    }
}

use std::collections::BTreeMap;
use std::path::Path;

/// `DnsConfig`: maps a bind IP to the name of the zone file (without
/// extension) that authoritative server answers from.
pub type DnsConfig = BTreeMap<String, String>;
/// `HttpConfig`: maps a proxy bind IP to the fallback message it returns
/// when a requested name can't be resolved or fetched (§6 — the proxy is
/// a thin consumer of the resolver).
pub type HttpConfig = BTreeMap<String, String>;

/// `RecResConfig`: a single recognized key, `"root"`, naming the root
/// name server's IP.
#[derive(Debug, serde::Deserialize)]
pub struct RecResConfig {
    pub root: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    #[serde(rename = "DnsConfig", default)]
    pub dns: DnsConfig,
    #[serde(rename = "HttpConfig", default)]
    pub http: HttpConfig,
    #[serde(rename = "RecResConfig")]
    pub rec_res: RecResConfig,
}

impl Config {
    pub fn load(path: &Path) -> Self {
        let conf = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .required(true)
                    .format(::config::FileFormat::Json),
            )
            .add_source(::config::Environment::default().separator("_"))
            .build()
            .expect("unable to locate configuration file");
        conf.try_deserialize()
            .expect("configuration format invalid")
    }
}

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context as _;
use serde::Serialize;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

const DEFAULT_PROBE: (&str, u16) = ("8.8.8.8", 80);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogHandler {
    Console,
    File,
    #[value(alias = "stash")]
    Logstash,
}

/// Fixed context attached to every record: service tag, worker name and host IP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogContext {
    pub tag: String,
    pub worker: String,
    pub host: String,
}

impl LogContext {
    pub fn new(tag: &str, worker: &str, probe: Option<(&str, u16)>) -> Self {
        Self {
            tag: tag.to_string(),
            worker: worker.to_string(),
            host: host_ip(probe),
        }
    }

    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "aggregator",
            tag = %self.tag,
            worker = %self.worker,
            host = %self.host,
        )
    }
}

#[derive(Clone, Debug)]
pub struct LogSettings {
    pub level: String,
    pub handler: LogHandler,
    pub log_file: Option<PathBuf>,
    pub logstash: Option<(String, u16)>,
    pub context: LogContext,
}

/// Keeps the remote sink's worker alive; pending records are flushed on drop.
pub struct LogGuard {
    _remote: Option<WorkerGuard>,
}

/// Local address the OS would use to reach `probe`, i.e. our outward-facing IP.
pub fn host_ip(probe: Option<(&str, u16)>) -> String {
    let target = probe.unwrap_or(DEFAULT_PROBE);
    let discovered = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect(target)?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string());

    match discovered {
        Ok(ip) => ip,
        Err(_) if target != DEFAULT_PROBE => host_ip(None),
        Err(_) => "unknown".to_string(),
    }
}

#[derive(Clone, Default)]
struct SharedWriter {
    file: Arc<Mutex<Option<File>>>,
    remote: Option<NonBlocking>,
}

struct MultiWriter {
    file: Arc<Mutex<Option<File>>>,
    remote: Option<NonBlocking>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedWriter {
    type Writer = MultiWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiWriter {
            file: self.file.clone(),
            remote: self.remote.clone(),
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.write_all(buf);
            }
        }
        if let Some(remote) = self.remote.as_mut() {
            let _ = remote.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct LogstashRecord<'a> {
    #[serde(rename = "@version")]
    version: &'static str,
    message: &'a str,
    tag: &'a str,
    worker: &'a str,
    host: &'a str,
}

/// Ships formatted lines to a logstash TCP input as one JSON object per line.
/// Reconnects lazily after a failed write.
struct LogstashWriter {
    addr: (String, u16),
    context: LogContext,
    stream: Option<TcpStream>,
}

impl LogstashWriter {
    fn new(addr: (String, u16), context: LogContext) -> Self {
        Self {
            addr,
            context,
            stream: None,
        }
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let addr = (self.addr.0.as_str(), self.addr.1)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "logstash host did not resolve"))?;
        TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
    }

    fn encode(&self, line: &str) -> io::Result<Vec<u8>> {
        let record = LogstashRecord {
            version: "1",
            message: line.trim_end(),
            tag: &self.context.tag,
            worker: &self.context.worker,
            host: &self.context.host,
        };
        let mut payload = serde_json::to_vec(&record)?;
        payload.push(b'\n');
        Ok(payload)
    }
}

impl Write for LogstashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let payload = self.encode(&String::from_utf8_lossy(buf))?;
        if self.stream.is_none() {
            self.stream = Some(self.connect()?);
        }
        if let Some(stream) = self.stream.as_mut() {
            if let Err(err) = stream.write_all(&payload) {
                self.stream = None;
                return Err(err);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

pub fn init(settings: &LogSettings) -> anyhow::Result<LogGuard> {
    let _ = tracing_log::LogTracer::init();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&settings.level))
        .with_context(|| format!("invalid log level {:?}", settings.level))?;

    let mut writer = SharedWriter::default();
    let mut remote_guard = None;
    match settings.handler {
        LogHandler::Console => {}
        LogHandler::File => {
            let path = settings
                .log_file
                .as_deref()
                .context("file log handler requires a log file path")?;
            let file = open_log_file(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            writer.file = Arc::new(Mutex::new(Some(file)));
        }
        LogHandler::Logstash => {
            let addr = settings
                .logstash
                .clone()
                .context("logstash log handler requires a logstash host")?;
            let (non_blocking, guard) = tracing_appender::non_blocking(LogstashWriter::new(
                addr,
                settings.context.clone(),
            ));
            writer.remote = Some(non_blocking);
            remote_guard = Some(guard);
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(settings.handler == LogHandler::Console)
        .with_writer(writer)
        .try_init();

    Ok(LogGuard {
        _remote: remote_guard,
    })
}

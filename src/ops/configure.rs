//! The resolution pipeline.
//!
//! Compiler, host, tools, toolkit, then probes. Each stage feeds the
//! builder; the result is frozen once everything has run.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::host::{detect_distribution, HostDescriptor};
use crate::core::resolved::{ResolvedConfiguration, ResolvedConfigurationBuilder};
use crate::ops::acquire::Acquirer;
use crate::ops::tools::{detect_tools, find_cc};
use crate::probe::{run_standard_checks, Prober};
use crate::sources::archive::Unpacker;
use crate::sources::fetch::Fetch;
use crate::util::config::Config;
use crate::util::process::{runner_for, CommandRunner, PosixRunner};
use crate::util::reporter::Reporter;

/// One configure run over a loaded [`Config`].
pub struct Pipeline<'a> {
    config: &'a Config,
    fetcher: &'a dyn Fetch,
    reporter: &'a dyn Reporter,
    runner: Option<&'a dyn CommandRunner>,
    triple: Option<String>,
    distribution_root: PathBuf,
    search_path: Option<OsString>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, fetcher: &'a dyn Fetch, reporter: &'a dyn Reporter) -> Self {
        Pipeline {
            config,
            fetcher,
            reporter,
            runner: None,
            triple: None,
            distribution_root: PathBuf::from("/"),
            search_path: None,
        }
    }

    /// Use this runner instead of the one picked for the host.
    pub fn with_runner(mut self, runner: &'a dyn CommandRunner) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Skip host detection and use this triple.
    pub fn with_triple(mut self, triple: Option<String>) -> Self {
        self.triple = triple;
        self
    }

    /// Root that `etc/*-release` files are read from.
    pub fn with_distribution_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.distribution_root = root.into();
        self
    }

    /// Search path for the locator and parser generator instead of PATH.
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn run(self) -> Result<ResolvedConfiguration> {
        let cc = find_cc(&self.config.tools)?;

        let host = match &self.triple {
            Some(triple) => HostDescriptor::parse(triple),
            None => HostDescriptor::detect(self.runner.unwrap_or(&PosixRunner), &cc, self.reporter),
        };
        if host.is_degenerate() {
            self.reporter
                .warn("could not determine the host triple; prebuilt packages will be skipped");
        } else {
            self.reporter.info(&format!("host is {}", host));
        }

        let host_runner = runner_for(&host, &self.config.tools.perl);
        let runner: &dyn CommandRunner = match self.runner {
            Some(runner) => runner,
            None => host_runner.as_ref(),
        };

        let tools = detect_tools(
            &self.config.tools,
            &cc,
            runner,
            self.reporter,
            self.search_path.as_deref(),
        )?;

        let distribution = if host.is_linux {
            detect_distribution(&self.distribution_root)
        } else {
            None
        };
        if let Some(distribution) = &distribution {
            self.reporter
                .debug(&format!("distribution is {}", distribution));
        }

        let toolkit = Acquirer::new(
            &self.config.toolkit,
            &host,
            runner,
            self.fetcher,
            self.reporter,
        )
        .with_distribution(distribution)
        .with_unpacker(Unpacker::new(&self.config.tools.tar))
        .with_search_path(self.search_path.clone())
        .acquire()?;

        let prober = Prober::new(&cc, &host, runner, self.reporter)
            .with_cflags(&self.config.tools.cflags);
        let facts = run_standard_checks(&prober, &self.config.probes)?;

        let mut builder = ResolvedConfigurationBuilder::new();
        builder
            .host(host)
            .tools(tools)
            .toolkit(toolkit)
            .record_all(facts);
        builder.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::CandidateKind;
    use crate::test_support::{tarball, CommandPattern, FakeFetcher, MockRunner, RecordingReporter};
    use crate::util::config::{ProbeConfig, Requirement};
    use crate::util::hash::md5_file;
    use crate::util::process::CommandOutput;
    use tempfile::TempDir;

    const MIRROR: &str = "https://mirror.test/prebuilt/";

    struct Scenario {
        root: TempDir,
        config: Config,
        runner: MockRunner,
        fetcher: FakeFetcher,
        reporter: RecordingReporter,
    }

    impl Scenario {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let mut config = Config::default();
            config.tools.cc = Some(PathBuf::from("cc"));
            config.tools.cxx = Some(PathBuf::from("c++"));
            config.toolkit.prebuilt_mirrors = vec![MIRROR.to_string()];
            config.toolkit.archive_extension = "tar.gz".to_string();
            config.toolkit.source_url = Some("https://releases.test/llvm-2.8.tgz".to_string());
            config.probes = ProbeConfig {
                functions: vec!["backtrace".to_string()],
                headers: Vec::new(),
                flags: Vec::new(),
            };
            config.anchor_paths(root.path());

            let runner = MockRunner::new();
            runner.expect_exact("cc -dumpversion", CommandOutput::ok("4.4.5\n"));
            runner.expect_prefix("cc -o", CommandOutput::ok(""));
            runner.expect(CommandPattern::Regex("little_endian$".into()), CommandOutput::exited(0));
            runner.expect(CommandPattern::Regex("sizeof_int$".into()), CommandOutput::exited(4));
            runner.expect(CommandPattern::Regex("sizeof_\\w+$".into()), CommandOutput::exited(8));
            runner.expect_prefix("cc -S", CommandOutput::ok(""));

            Scenario {
                root,
                config,
                runner,
                fetcher: FakeFetcher::new(),
                reporter: RecordingReporter::new(),
            }
        }

        fn run(&self) -> Result<ResolvedConfiguration> {
            let etc = self.root.path().join("sysroot/etc");
            std::fs::create_dir_all(&etc).unwrap();
            std::fs::write(
                etc.join("lsb-release"),
                "DISTRIB_ID=Ubuntu\nDISTRIB_RELEASE=10.04\n",
            )
            .unwrap();

            Pipeline::new(&self.config, &self.fetcher, &self.reporter)
                .with_runner(&self.runner)
                .with_triple(Some("x86_64-unknown-linux-gnu".to_string()))
                .with_distribution_root(self.root.path().join("sysroot"))
                .with_search_path(Some(self.root.path().join("no-bin").into_os_string()))
                .run()
        }

        fn package(&self, top: Option<&str>) -> Vec<u8> {
            let path = self.root.path().join("pkg.tar.gz");
            let prefix = top.map(|t| format!("{}/", t)).unwrap_or_default();
            tarball(&path, &[(&format!("{}Release/bin/llvm-config", prefix), "")]);
            std::fs::read(&path).unwrap()
        }
    }

    #[test]
    fn test_prebuilt_scenario() {
        let sc = Scenario::new();
        let name = "llvm-2.8-x86_64-unknown-linux-gnu-ubuntu-10.04.tar.gz";
        let bytes = sc.package(None);
        let md5 = md5_file(&sc.root.path().join("pkg.tar.gz")).unwrap();
        sc.fetcher.serve(&format!("{}{}", MIRROR, name), bytes);
        sc.fetcher.serve(
            &format!("{}{}.md5", MIRROR, name),
            format!("{} {}\n", md5, name).into_bytes(),
        );

        let resolved = sc.run().unwrap();

        assert_eq!(resolved.toolkit_kind(), CandidateKind::Prebuilt);
        assert!(resolved.toolkit_enabled());
        assert!(resolved.jit_enabled());
        assert_eq!(resolved.toolkit_api_version(), Some(208));
        assert_eq!(resolved.flag("little_endian"), Some(true));
        assert_eq!(resolved.int("sizeof_int"), Some(4));
        assert_eq!(resolved.int("sizeof_pointer"), Some(8));
        assert_eq!(resolved.flag("have_backtrace"), Some(true));
        assert_eq!(resolved.host().triple(), "x86_64-unknown-linux-gnu");
    }

    #[test]
    fn test_source_scenario_after_all_prebuilt_misses() {
        let sc = Scenario::new();
        sc.fetcher.serve(
            "https://releases.test/llvm-2.8.tgz",
            sc.package(Some("llvm-2.8")),
        );

        let resolved = sc.run().unwrap();

        assert_eq!(resolved.toolkit_kind(), CandidateKind::Source);
        let requests = sc.fetcher.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].ends_with("-ubuntu-10.04.tar.gz"));
        assert!(requests[1].ends_with("x86_64-unknown-linux-gnu.tar.gz"));
    }

    #[test]
    fn test_none_scenario_is_soft() {
        let sc = Scenario::new();

        let resolved = sc.run().unwrap();

        assert_eq!(resolved.toolkit_kind(), CandidateKind::None);
        assert!(!resolved.toolkit_enabled());
        assert!(!resolved.jit_enabled());
        assert_eq!(resolved.toolkit_api_version(), None);
        assert_eq!(resolved.flag("little_endian"), Some(true));
        assert!(!sc.reporter.warnings().is_empty());
    }

    #[test]
    fn test_probe_failure_aborts() {
        let sc = Scenario::new();
        let runner = MockRunner::new();
        runner.expect_exact("cc -dumpversion", CommandOutput::ok("4.4.5\n"));
        runner.expect_prefix("cc -o", CommandOutput::failed(1, "cc1: out of memory"));

        let mut config = sc.config.clone();
        config.toolkit.requirement = Requirement::Disabled;
        let err = Pipeline::new(&config, &sc.fetcher, &sc.reporter)
            .with_runner(&runner)
            .with_triple(Some("x86_64-unknown-linux-gnu".to_string()))
            .with_distribution_root(sc.root.path())
            .with_search_path(Some(sc.root.path().join("no-bin").into_os_string()))
            .run()
            .unwrap_err();

        assert!(err.to_string().contains("little_endian"));
    }
}

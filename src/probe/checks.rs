//! The standard set of host checks.

use anyhow::{bail, Result};

use crate::core::resolved::CapabilityFact;
use crate::ops::errors::ConfigureError;
use crate::probe::prober::Prober;
use crate::util::config::ProbeConfig;

/// Types whose sizes the build needs.
const SIZED_TYPES: &[(&str, &str)] = &[
    ("pointer", "void*"),
    ("long", "long"),
    ("int", "int"),
    ("size_t", "size_t"),
];

const ENDIAN_SOURCE: &str = r#"int main(void) {
  unsigned int one = 1;
  return (*(unsigned char*)&one == 1) ? 0 : 1;
}
"#;

/// Fact name fragment for a header, function or flag.
///
/// `sys/sysctl.h` becomes `sys_sysctl_h`, `-Wno-unused-function` becomes
/// `wno_unused_function`.
pub fn sanitize(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    mapped.trim_matches('_').to_string()
}

/// Run a probe that must compile.
fn required(prober: &Prober<'_>, name: &str, source: &str) -> Result<i32> {
    match prober.compile_and_run(name, source)? {
        Some(status) => Ok(status),
        None => Err(ConfigureError::ProbeFailed {
            name: name.to_string(),
        }
        .into()),
    }
}

/// Byte order: the probe exits 0 on little-endian hosts, 1 on big-endian.
pub fn little_endian(prober: &Prober<'_>) -> Result<CapabilityFact> {
    match required(prober, "little_endian", ENDIAN_SOURCE)? {
        0 => Ok(CapabilityFact::flag("little_endian", true)),
        1 => Ok(CapabilityFact::flag("little_endian", false)),
        other => bail!("byte order probe exited with unexpected status {}", other),
    }
}

/// `sizeof_<label>`, carried in the probe's exit status.
pub fn size_of(prober: &Prober<'_>, label: &str, c_type: &str) -> Result<CapabilityFact> {
    let name = format!("sizeof_{}", sanitize(label));
    let source = format!(
        "#include <stddef.h>\nint main(void) {{ return (int)sizeof({}); }}\n",
        c_type
    );
    let size = required(prober, &name, &source)?;
    Ok(CapabilityFact::int(name, i64::from(size)))
}

/// `have_<function>`: the symbol is declared and its address can be taken.
///
/// Compiled only; the program is never run.
pub fn has_function(prober: &Prober<'_>, function: &str) -> Result<CapabilityFact> {
    let name = format!("have_{}", sanitize(function));
    let source = format!(
        "char {f}();\nint main(void) {{\n  void *p = (void *)&{f};\n  return p != 0 ? 0 : 1;\n}}\n",
        f = function
    );
    let present = prober.compile_and_inspect(&name, &source, None)?;
    Ok(CapabilityFact::flag(name, present))
}

/// `have_<header>`: the header can be included.
pub fn has_header(prober: &Prober<'_>, header: &str) -> Result<CapabilityFact> {
    let name = format!("have_{}", sanitize(header));
    let source = format!("#include <{}>\nint main(void) {{ return 0; }}\n", header);
    let present = prober.compile_and_inspect(&name, &source, None)?;
    Ok(CapabilityFact::flag(name, present))
}

/// `cc_accepts_<flag>`.
pub fn accepts_flag(prober: &Prober<'_>, flag: &str) -> Result<CapabilityFact> {
    let accepted = prober.accepts_flag(flag)?;
    Ok(CapabilityFact::flag(
        format!("cc_accepts_{}", sanitize(flag)),
        accepted,
    ))
}

/// Byte order, type sizes, then the configured optional probes.
pub fn run_standard_checks(prober: &Prober<'_>, probes: &ProbeConfig) -> Result<Vec<CapabilityFact>> {
    let mut facts = vec![little_endian(prober)?];

    for (label, c_type) in SIZED_TYPES {
        facts.push(size_of(prober, label, c_type)?);
    }
    for function in &probes.functions {
        facts.push(has_function(prober, function)?);
    }
    for header in &probes.headers {
        facts.push(has_header(prober, header)?);
    }
    for flag in &probes.flags {
        facts.push(accepts_flag(prober, flag)?);
    }

    Ok(facts)
}

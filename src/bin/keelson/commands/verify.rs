//! `keelson verify` command

use anyhow::{bail, Result};
use keelson::util::hash::checksum_record;
use keelson::util::shell::{Shell, Status};

use crate::cli::VerifyArgs;

pub fn execute(args: VerifyArgs, shell: &Shell) -> Result<()> {
    let record = checksum_record(&args.digest_file, &args.artifact)?;

    if !record.matches() {
        bail!(
            "checksum mismatch for {}:\n  expected: {}\n  actual:   {}",
            args.artifact.display(),
            record.expected,
            record.actual
        );
    }

    shell.status(Status::Finished, format!("{} verified", args.artifact.display()));
    println!("{}", record.actual);
    Ok(())
}

/// Invokes the external assembler and linker codegen depends on.
///
/// Neither tool is part of this crate — per scope, `nasm`/`ld` themselves
/// are an external collaborator. This module's only job is "run a command,
/// inherit stdio so the user sees its output, and turn a nonzero exit code
/// into a diagnosable error", the same shape the compiler's shelling-out
/// takes elsewhere in the pack for invoking other build tools.
use std::process::Command;

use log::debug;

use crate::config::StaqConfig;
use crate::errors::StaqError;

/// Run `program` with `args`, echoing the command, inheriting stdio, and
/// mapping a nonzero exit status to [`StaqError::Toolchain`].
fn run_checked(program: &str, args: &[&str]) -> Result<(), StaqError> {
    let command_line = format!("{} {}", program, args.join(" "));
    eprintln!("+ {}", command_line);
    debug!("toolchain: running `{}`", command_line);

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| StaqError::Io {
            path: program.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(StaqError::Toolchain {
            command: command_line,
            status: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

/// Assemble `asm_path` into an object file and link it into an executable,
/// using the assembler/linker and output paths from `config`.
pub fn assemble_and_link(asm_path: &str, config: &StaqConfig) -> Result<(), StaqError> {
    run_checked(
        &config.assembler,
        &[
            "-felf64",
            "-g",
            "-F",
            "dwarf",
            asm_path,
            "-o",
            &config.object_path,
        ],
    )?;
    run_checked(&config.linker, &[&config.object_path, "-o", &config.binary_path])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_an_io_error_not_a_panic() {
        let err = run_checked("definitely-not-a-real-toolchain-binary", &[]).unwrap_err();
        assert!(matches!(err, StaqError::Io { .. }));
    }

    #[test]
    fn nonzero_exit_is_a_toolchain_error() {
        // `false` always exits 1 and exists on any POSIX system this crate targets.
        let err = run_checked("false", &[]).unwrap_err();
        assert!(matches!(err, StaqError::Toolchain { status: 1, .. }));
    }
}

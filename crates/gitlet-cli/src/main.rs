//! gitlet CLI — command dispatch and console output.
//!
//! All semantics live in gitlet-core; this binary validates operands,
//! prints results, and maps every recognized error to its exact
//! user-visible message. Errors are part of the console protocol, not
//! the exit status: gitlet always exits 0.

use std::env;
use std::path::Path;
use std::process;

use gitlet_core::merge::MergeOutcome;
use gitlet_core::{GitletResult, Repository};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        exit_with("Please enter a command.");
    }
    let cwd = match env::current_dir() {
        Ok(dir) => dir,
        Err(e) => exit_with(&format!("I/O error: {e}")),
    };

    if let Err(e) = run(&cwd, &args) {
        println!("{e}");
    }
    process::exit(0);
}

/// Print a boundary message and stop.
fn exit_with(message: &str) -> ! {
    println!("{message}");
    process::exit(0);
}

fn run(cwd: &Path, args: &[String]) -> GitletResult<()> {
    let command = args[0].as_str();
    if command == "init" {
        require_operands(args, 1);
        Repository::init(cwd)?;
        return Ok(());
    }

    let mut repo = Repository::load(cwd)?;
    match command {
        "add" => {
            require_operands(args, 2);
            repo.add(&args[1])
        }
        "commit" => {
            if args.len() == 1 {
                exit_with("Please enter a commit message.");
            }
            require_operands(args, 2);
            if args[1].is_empty() {
                exit_with("Please enter a commit message.");
            }
            repo.commit(&args[1])
        }
        "rm" => {
            require_operands(args, 2);
            repo.remove(&args[1])
        }
        "log" => {
            require_operands(args, 1);
            println!("{}", repo.log()?);
            Ok(())
        }
        "global-log" => {
            require_operands(args, 1);
            println!("{}", repo.global_log()?);
            Ok(())
        }
        "status" => {
            require_operands(args, 1);
            print!("{}", repo.status());
            Ok(())
        }
        "checkout" => run_checkout(&mut repo, args),
        "branch" => {
            require_operands(args, 2);
            repo.branch(&args[1])
        }
        "find" => {
            require_operands(args, 2);
            println!("{}", repo.find(&args[1])?.join("\n"));
            Ok(())
        }
        "rm-branch" => {
            require_operands(args, 2);
            repo.rm_branch(&args[1])
        }
        "reset" => {
            require_operands(args, 2);
            repo.reset(&args[1])
        }
        "merge" => {
            require_operands(args, 2);
            match repo.merge(&args[1])? {
                MergeOutcome::FastForwarded => {
                    println!("Current branch fast-forwarded.");
                }
                MergeOutcome::Merged { conflicted: true } => {
                    println!("Encountered a merge conflict.");
                }
                MergeOutcome::Merged { conflicted: false } => {}
            }
            Ok(())
        }
        "author" => {
            require_operands(args, 2);
            repo.set_author(&args[1])
        }
        _ => exit_with("No command with that name exists."),
    }
}

/// The three checkout forms, keyed on the literal `--` operand:
/// `checkout -- <file>`, `checkout <id> -- <file>`, `checkout <branch>`.
fn run_checkout(repo: &mut Repository, args: &[String]) -> GitletResult<()> {
    match args {
        [_, sep, file] if sep.as_str() == "--" => repo.checkout_file_at_head(file),
        [_, id, sep, file] if sep.as_str() == "--" => repo.checkout_file_at_commit(id, file),
        [_, branch] => repo.checkout_branch(branch),
        _ => exit_with("Incorrect operands."),
    }
}

/// Exit with the operand error unless the argument count matches.
fn require_operands(args: &[String], n: usize) {
    if args.len() != n {
        exit_with("Incorrect operands.");
    }
}

mod commit;
mod concurrency;
mod conflicts;
mod dry_run;
mod error_policy;

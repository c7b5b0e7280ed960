/*
[INPUT]:  Parsed subcommand arguments from main
[OUTPUT]: Interactive CLI flows
[POS]:    CLI layer
[UPDATE]: When adding new interactive subcommands
*/

pub mod init;

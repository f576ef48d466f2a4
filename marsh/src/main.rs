// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

fn main() {
    std::process::exit(marsh::run().code())
}

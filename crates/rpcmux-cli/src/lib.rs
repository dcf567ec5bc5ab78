// Copyright 2025 rpcmux Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # rpcmux CLI
//!
//! Command-line front end for the rpcmux batching client.
//!
//! - `rpcmux call`: one JSON-RPC call, raw JSON result on stdout
//! - `rpcmux block-number`: latest block number as a decimal
//! - `rpcmux burst`: many concurrent calls through one dispatcher, then the
//!   dispatcher's counters as JSON
//!
//! The binary parses arguments with `argh` and drives dispatchers from
//! `rpcmux-client`.

pub mod burst;

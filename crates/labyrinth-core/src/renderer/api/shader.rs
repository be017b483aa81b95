// Copyright 2025 eraflo
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

//! Shader module descriptors.

use std::borrow::Cow;

/// Shader source code handed to the backend.
#[derive(Debug, Clone)]
pub enum ShaderSourceData<'a> {
    /// WGSL text.
    Wgsl(Cow<'a, str>),
}

/// A descriptor used to create a [`ShaderModuleId`].
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// An optional debug label, usually the shader file name.
    pub label: Option<&'a str>,
    /// The shader source.
    pub source: ShaderSourceData<'a>,
}

/// An opaque handle to a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub usize);

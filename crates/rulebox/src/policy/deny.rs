//! Built-in deny-list.
//!
//! Names of capabilities no predicate may mention. Matching is exact and
//! case-sensitive on identifier tokens, wherever they appear: bare names,
//! member names, lambda parameters and `typeof` operands.

/// Identifiers rejected under every policy.
pub const DEFAULT_DENIED: &[&str] = &[
    // Core runtime
    "Environment",
    "Console",
    "AppDomain",
    "GC",
    // File system
    "File",
    "FileInfo",
    "Directory",
    "DirectoryInfo",
    "Path",
    "DriveInfo",
    // Processes and diagnostics
    "Process",
    "ProcessStartInfo",
    "EventLog",
    "EventLogEntry",
    "PerformanceCounter",
    // Registry
    "Registry",
    "RegistryKey",
    // Networking
    "WebClient",
    "HttpClient",
    "WebRequest",
    "HttpRequest",
    "Dns",
    "Socket",
    "NetworkStream",
    "TcpClient",
    "TcpListener",
    "UdpClient",
    "NamedPipeClientStream",
    "NamedPipeServerStream",
    // Cryptography
    "CryptoStream",
    "SymmetricAlgorithm",
    "AsymmetricAlgorithm",
    "RSA",
    "DSA",
    "SHA256",
    "SHA512",
    "SHA1",
    "MD5",
    "ProtectedData",
    "Aes",
    // Reflection and dynamic code
    "Activator",
    "Assembly",
    "AssemblyBuilder",
    "AssemblyName",
    "FieldInfo",
    "MethodInfo",
    "PropertyInfo",
    "ConstructorInfo",
    "TypeInfo",
    "Type",
    "MethodBase",
    "DynamicMethod",
    "ILGenerator",
    "ParameterInfo",
    // Threading
    "Thread",
    "ThreadPool",
    "Task",
    "Timer",
    "CancellationToken",
    "Semaphore",
    "Mutex",
    "AutoResetEvent",
    "ManualResetEvent",
    // Unmanaged memory and interop
    "GCHandle",
    "Marshal",
    "SafeHandle",
    "UnmanagedFunctionPointer",
    "DllImport",
    "StructLayout",
    "SecurityCriticalAttribute",
    "SecuritySafeCriticalAttribute",
    "Pointer",
    "Span",
    "Memory",
    "MemoryManager",
    "FixedBuffer",
    "DllImportAttribute",
    "UnmanagedType",
    "CallingConvention",
    "ComImportAttribute",
    "ExternAttribute",
    // Serialization
    "BinaryFormatter",
    "SoapFormatter",
    "Formatter",
    "DataContractSerializer",
    "XmlSerializer",
    // Debugging
    "StackTrace",
    "StackFrame",
    "Debug",
    "Trace",
    "Debugger",
    "DebuggerStepThroughAttribute",
    "ConditionalAttribute",
];

/// Introspection operations, rejected as reflection wherever they are named.
pub const REFLECTION_NAMES: &[&str] = &[
    "GetType",
    "GetTypeInfo",
    "GetTypeCode",
    "nameof",
    "InvokeMember",
];

pub fn is_reflection_name(name: &str) -> bool {
    REFLECTION_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn no_duplicates() {
        let unique: HashSet<_> = DEFAULT_DENIED.iter().collect();
        assert_eq!(unique.len(), DEFAULT_DENIED.len());
    }

    #[test]
    fn reflection_names() {
        assert!(is_reflection_name("GetType"));
        assert!(is_reflection_name("nameof"));
        assert!(!is_reflection_name("gettype"));
    }
}

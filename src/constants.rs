pub const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n";
pub const BAD_REQUEST: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: application/json\r\n";
pub const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\n";
pub const CONFLICT: &str = "HTTP/1.1 409 Conflict\r\nContent-Type: application/json\r\n";
pub const INTERNAL_ERROR: &str =
    "HTTP/1.1 500 Internal Server Error\r\nContent-Type: application/json\r\n";

pub const MAX_HEADER_BYTES: usize = 8 * 1024;
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:7879";

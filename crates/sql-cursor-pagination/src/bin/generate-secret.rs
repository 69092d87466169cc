//! Print a freshly generated cursor secret.

use sql_cursor_pagination::generate_secret;

fn main() {
   let secret = generate_secret();

   println!("use sql_cursor_pagination::CursorSecret;");
   println!();
   println!("let secret = CursorSecret::new({secret:?})?;");
}

#[cfg(test)]
mod server;
#[cfg(test)]
mod tests;

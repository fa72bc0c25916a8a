pub mod semantic;

#[cfg(test)]
mod tests;

mod test_client_identity;
mod test_pinned_verifier;

use alloy_sol_types::sol;

// ── FlightSuretyApp (oracle-facing surface) ──────────────────────────────────

sol! {
    interface IFlightSuretyApp {
        function REGISTRATION_FEE() external view returns (uint256);
        function registerOracle() external payable;
        function getMyIndexes() external view returns (uint8[3]);
        function submitOracleResponse(
            uint8 index,
            address airline,
            string flight,
            uint256 timestamp,
            uint8 statusCode
        ) external;
        function fetchFlightStatus(address airline, string flight, uint256 timestamp) external;

        event OracleRequest(uint8 index, address airline, string flight, uint256 timestamp);
        event OracleReport(address airline, string flight, uint256 timestamp, uint8 status);
    }
}

// ── FlightSuretyData ─────────────────────────────────────────────────────────

sol! {
    interface IFlightSuretyData {
        function creditInsurees(string flight) external;
    }
}
